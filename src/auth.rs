// src/auth.rs
//
// Bearer tokens are issued by the hosted auth service; we only verify them
// (GET /auth/v1/user) and look the caller's role up in `user_roles`.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{internal_error, AppError, AppResult, INTERNAL_MESSAGE};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    /// Restricted back-office role; may still read the dashboards.
    Limitada,
}

pub fn canonicalize_role(role: &str) -> Option<Role> {
    match role.trim().to_lowercase().as_str() {
        "admin" => Some(Role::Admin),
        "limitada" | "limited" => Some(Role::Limitada),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

/// Any caller holding a valid token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

/// Caller allowed to read the reporting dashboards.
#[derive(Debug, Clone)]
pub struct ReportViewer {
    pub user: AuthenticatedUser,
    pub role: Role,
}

pub fn bearer_token(headers: &HeaderMap) -> AppResult<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("Token ausente ou inválido"))
}

pub async fn resolve_token(state: &AppState, token: &str) -> AppResult<AuthenticatedUser> {
    let url = format!("{}/auth/v1/user", state.config.supabase_url);
    let resp = state
        .http
        .get(&url)
        .header("apikey", &state.config.supabase_anon_key)
        .bearer_auth(token)
        .send()
        .await
        .map_err(internal_error)?;

    match resp.status() {
        s if s.is_success() => resp.json::<AuthenticatedUser>().await.map_err(internal_error),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(AppError::unauthorized("Token ausente ou inválido"))
        }
        other => {
            tracing::warn!(status = %other, "auth service rejected token lookup");
            Err(AppError::internal(INTERNAL_MESSAGE))
        }
    }
}

pub async fn fetch_role(pool: &PgPool, user_id: Uuid) -> AppResult<Option<String>> {
    let role: Option<(String,)> =
        sqlx::query_as(r#"SELECT role FROM public.user_roles WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(role.map(|(r,)| r))
}

pub fn authorize_reports(role: Option<&str>) -> AppResult<Role> {
    let Some(raw) = role else {
        return Err(AppError::forbidden("Usuário sem perfil de acesso"));
    };
    canonicalize_role(raw).ok_or_else(|| AppError::forbidden("Perfil sem acesso aos relatórios"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user = resolve_token(state, &token).await?;
        Ok(AuthUser(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ReportViewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        let role = fetch_role(&state.pool, user.id).await?;
        let role = authorize_reports(role.as_deref()).map_err(|e| {
            tracing::warn!(user_id = %user.id, "report access denied");
            e
        })?;
        Ok(ReportViewer { user, role })
    }
}
