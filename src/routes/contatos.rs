// src/routes/contatos.rs

use axum::{extract::{Path, Query, State}, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{query, query_as, PgPool};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::drafts::{save_with_deadline, DraftOutcome};
use crate::error::AppResult;
use crate::models::{Contato, Deleted};
use crate::{fields, AppState};
use super::{page, ListQ};

#[derive(Debug, Deserialize)]
pub struct CreateContatoBody {
    pub nome_completo: String,
    pub apelido_relacionamento: Option<String>,
    pub cargo: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub observacoes: Option<String>,
    pub data_aniversario: Option<NaiveDate>,
    pub pessoa_site: Option<String>,
    pub pessoa_redes: Option<String>,
    pub canal_relatorio: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchContatoBody {
    pub nome_completo: Option<String>,
    pub apelido_relacionamento: Option<String>,
    pub cargo: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub observacoes: Option<String>,
    pub data_aniversario: Option<NaiveDate>,
    pub pessoa_site: Option<String>,
    pub pessoa_redes: Option<String>,
    pub canal_relatorio: Option<Vec<String>>,
}

/// A contact may receive reports only through at least one chosen channel.
pub fn message_authorization(canais: Option<&[String]>) -> Option<bool> {
    canais.map(|c| c.iter().any(|canal| !canal.trim().is_empty()))
}

// GET /api/v1/contatos
pub async fn list_contatos(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> AppResult<Json<Vec<Contato>>> {
    let (limit, offset) = page(&q);

    let rows = if let Some(pattern) = q.pattern() {
        query_as::<_, Contato>(
            r#"SELECT * FROM public.crm_contatos
               WHERE nome_completo ILIKE $1 OR celular ILIKE $1 OR email ILIKE $1 OR cargo ILIKE $1
               ORDER BY updated_at DESC
               LIMIT $2 OFFSET $3"#)
            .bind(pattern).bind(limit).bind(offset)
            .fetch_all(&state.pool).await?
    } else {
        query_as::<_, Contato>(
            r#"SELECT * FROM public.crm_contatos ORDER BY updated_at DESC LIMIT $1 OFFSET $2"#)
            .bind(limit).bind(offset)
            .fetch_all(&state.pool).await?
    };
    Ok(Json(rows))
}

// GET /api/v1/contatos/:id
pub async fn get_contato(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Contato>> {
    let row = query_as::<_, Contato>(r#"SELECT * FROM public.crm_contatos WHERE id = $1"#)
        .bind(id)
        .fetch_one(&state.pool).await?;
    Ok(Json(row))
}

// POST /api/v1/contatos
pub async fn create_contato(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(b): Json<CreateContatoBody>,
) -> AppResult<Json<Contato>> {
    let autorizacao = message_authorization(b.canal_relatorio.as_deref()).unwrap_or(false);

    let row = query_as::<_, Contato>(
        r#"
        INSERT INTO public.crm_contatos
          (nome_completo, apelido_relacionamento, cargo, celular, email, observacoes,
           data_aniversario, pessoa_site, pessoa_redes, canal_relatorio, autorizacao_mensagem, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11, now())
        RETURNING *
        "#
    )
    .bind(fields::text(Some(b.nome_completo)).unwrap_or_default())
    .bind(fields::text(b.apelido_relacionamento))
    .bind(fields::text(b.cargo))
    .bind(fields::digits(b.celular))
    .bind(fields::email(b.email))
    .bind(fields::text(b.observacoes))
    .bind(b.data_aniversario)
    .bind(fields::text(b.pessoa_site))
    .bind(fields::text(b.pessoa_redes))
    .bind(b.canal_relatorio)
    .bind(autorizacao)
    .fetch_one(&state.pool).await?;

    tracing::info!(contato_id = %row.id, "contato created");
    Ok(Json(row))
}

// PATCH /api/v1/contatos/:id
pub async fn patch_contato(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<PatchContatoBody>,
) -> AppResult<Json<Contato>> {
    let row = update_contato(&state.pool, id, b).await?;
    Ok(Json(row))
}

// PUT /api/v1/contatos/:id/draft
pub async fn save_contato_draft(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<PatchContatoBody>,
) -> Json<DraftOutcome> {
    Json(save_with_deadline(update_contato(&state.pool, id, b), state.config.draft_timeout).await)
}

// DELETE /api/v1/contatos/:id
pub async fn delete_contato(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Deleted>> {
    let res = query(r#"DELETE FROM public.crm_contatos WHERE id = $1"#)
        .bind(id)
        .execute(&state.pool).await?;
    Ok(Json(Deleted { deleted: res.rows_affected() > 0 }))
}

async fn update_contato(pool: &PgPool, id: Uuid, b: PatchContatoBody) -> Result<Contato, sqlx::Error> {
    let autorizacao = message_authorization(b.canal_relatorio.as_deref());

    query_as::<_, Contato>(
        r#"
        UPDATE public.crm_contatos SET
          nome_completo          = COALESCE(NULLIF($2, ''), nome_completo),
          apelido_relacionamento = CASE WHEN $3::text IS NULL THEN apelido_relacionamento ELSE NULLIF($3, '') END,
          cargo                  = CASE WHEN $4::text IS NULL THEN cargo                  ELSE NULLIF($4, '') END,
          celular                = CASE WHEN $5::text IS NULL THEN celular                ELSE NULLIF($5, '') END,
          email                  = CASE WHEN $6::text IS NULL THEN email                  ELSE NULLIF($6, '') END,
          observacoes            = CASE WHEN $7::text IS NULL THEN observacoes            ELSE NULLIF($7, '') END,
          data_aniversario       = COALESCE($8, data_aniversario),
          pessoa_site            = CASE WHEN $9::text IS NULL THEN pessoa_site            ELSE NULLIF($9, '') END,
          pessoa_redes           = CASE WHEN $10::text IS NULL THEN pessoa_redes          ELSE NULLIF($10, '') END,
          canal_relatorio        = COALESCE($11, canal_relatorio),
          autorizacao_mensagem   = COALESCE($12, autorizacao_mensagem),
          updated_at             = now()
        WHERE id = $1
        RETURNING *
        "#
    )
    .bind(id)
    .bind(fields::patch_text(b.nome_completo))
    .bind(fields::patch_text(b.apelido_relacionamento))
    .bind(fields::patch_text(b.cargo))
    .bind(fields::patch_digits(b.celular))
    .bind(fields::patch_email(b.email))
    .bind(fields::patch_text(b.observacoes))
    .bind(b.data_aniversario)
    .bind(fields::patch_text(b.pessoa_site))
    .bind(fields::patch_text(b.pessoa_redes))
    .bind(b.canal_relatorio)
    .bind(autorizacao)
    .fetch_one(pool)
    .await
}
