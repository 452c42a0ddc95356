// src/routes/preferences.rs

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoSaveBody {
    pub enabled: bool,
}

// GET /api/v1/preferences/auto-save
pub async fn get_auto_save(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<AutoSaveBody>> {
    let enabled = state.auto_save.read(user.id).await?;
    Ok(Json(AutoSaveBody { enabled }))
}

// PUT /api/v1/preferences/auto-save
pub async fn put_auto_save(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(b): Json<AutoSaveBody>,
) -> AppResult<Json<AutoSaveBody>> {
    state.auto_save.write(user.id, b.enabled).await?;
    tracing::info!(user_id = %user.id, enabled = b.enabled, "auto-save preference updated");
    Ok(Json(AutoSaveBody { enabled: b.enabled }))
}
