// src/routes/clientes.rs

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;
use sqlx::{query, query_as, PgPool};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::drafts::{save_with_deadline, DraftOutcome};
use crate::error::AppResult;
use crate::models::{Cliente, Deleted};
use crate::{fields, AppState};
use super::{page, ListQ};

#[derive(Debug, Deserialize)]
pub struct CreateClienteBody {
    pub nome_cadastro: String,
    pub tipo_cliente: Option<String>,
    pub documento: Option<String>,
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub apelido_relacionamento: Option<String>,
    pub telefone_principal: Option<String>,
    pub email_principal: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub observacoes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub favorito: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchClienteBody {
    pub nome_cadastro: Option<String>,
    pub tipo_cliente: Option<String>,
    pub documento: Option<String>,
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub apelido_relacionamento: Option<String>,
    pub telefone_principal: Option<String>,
    pub email_principal: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub observacoes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub favorito: Option<bool>,
}

// GET /api/v1/clientes
pub async fn list_clientes(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> AppResult<Json<Vec<Cliente>>> {
    let (limit, offset) = page(&q);

    let rows = if let Some(pattern) = q.pattern() {
        query_as::<_, Cliente>(
            r#"SELECT * FROM public.crm_clientes
               WHERE nome_cadastro ILIKE $1 OR razao_social ILIKE $1 OR nome_fantasia ILIKE $1
                  OR documento ILIKE $1 OR telefone_principal ILIKE $1 OR email_principal ILIKE $1
               ORDER BY updated_at DESC
               LIMIT $2 OFFSET $3"#)
            .bind(pattern).bind(limit).bind(offset)
            .fetch_all(&state.pool).await?
    } else {
        query_as::<_, Cliente>(
            r#"SELECT * FROM public.crm_clientes ORDER BY updated_at DESC LIMIT $1 OFFSET $2"#)
            .bind(limit).bind(offset)
            .fetch_all(&state.pool).await?
    };
    Ok(Json(rows))
}

// GET /api/v1/clientes/:id
pub async fn get_cliente(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Cliente>> {
    let row = query_as::<_, Cliente>(r#"SELECT * FROM public.crm_clientes WHERE id = $1"#)
        .bind(id)
        .fetch_one(&state.pool).await?;
    Ok(Json(row))
}

// POST /api/v1/clientes
pub async fn create_cliente(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(b): Json<CreateClienteBody>,
) -> AppResult<Json<Cliente>> {
    let row = query_as::<_, Cliente>(
        r#"
        INSERT INTO public.crm_clientes
          (nome_cadastro, tipo_cliente, documento, razao_social, nome_fantasia,
           apelido_relacionamento, telefone_principal, email_principal, logradouro, numero,
           complemento, bairro, municipio, uf, cep, observacoes, tags, favorito, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18, now())
        RETURNING *
        "#
    )
    .bind(fields::text(Some(b.nome_cadastro)).unwrap_or_default())
    .bind(fields::text(b.tipo_cliente))
    .bind(fields::digits(b.documento))
    .bind(fields::text(b.razao_social))
    .bind(fields::text(b.nome_fantasia))
    .bind(fields::text(b.apelido_relacionamento))
    .bind(fields::digits(b.telefone_principal))
    .bind(fields::email(b.email_principal))
    .bind(fields::text(b.logradouro))
    .bind(fields::text(b.numero))
    .bind(fields::text(b.complemento))
    .bind(fields::text(b.bairro))
    .bind(fields::text(b.municipio))
    .bind(fields::text(b.uf))
    .bind(fields::digits(b.cep))
    .bind(fields::text(b.observacoes))
    .bind(b.tags)
    .bind(b.favorito)
    .fetch_one(&state.pool).await?;

    tracing::info!(cliente_id = %row.id, "cliente created");
    Ok(Json(row))
}

// PATCH /api/v1/clientes/:id
pub async fn patch_cliente(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<PatchClienteBody>,
) -> AppResult<Json<Cliente>> {
    let row = update_cliente(&state.pool, id, b).await?;
    Ok(Json(row))
}

// PUT /api/v1/clientes/:id/draft
pub async fn save_cliente_draft(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<PatchClienteBody>,
) -> Json<DraftOutcome> {
    let outcome = save_with_deadline(update_cliente(&state.pool, id, b), state.config.draft_timeout).await;
    Json(outcome)
}

// DELETE /api/v1/clientes/:id
pub async fn delete_cliente(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Deleted>> {
    let res = query(r#"DELETE FROM public.crm_clientes WHERE id = $1"#)
        .bind(id)
        .execute(&state.pool).await?;
    Ok(Json(Deleted { deleted: res.rows_affected() > 0 }))
}

async fn update_cliente(pool: &PgPool, id: Uuid, b: PatchClienteBody) -> Result<Cliente, sqlx::Error> {
    query_as::<_, Cliente>(
        r#"
        UPDATE public.crm_clientes SET
          nome_cadastro          = COALESCE(NULLIF($2, ''), nome_cadastro),
          tipo_cliente           = CASE WHEN $3::text  IS NULL THEN tipo_cliente           ELSE NULLIF($3, '')  END,
          documento              = CASE WHEN $4::text  IS NULL THEN documento              ELSE NULLIF($4, '')  END,
          razao_social           = CASE WHEN $5::text  IS NULL THEN razao_social           ELSE NULLIF($5, '')  END,
          nome_fantasia          = CASE WHEN $6::text  IS NULL THEN nome_fantasia          ELSE NULLIF($6, '')  END,
          apelido_relacionamento = CASE WHEN $7::text  IS NULL THEN apelido_relacionamento ELSE NULLIF($7, '')  END,
          telefone_principal     = CASE WHEN $8::text  IS NULL THEN telefone_principal     ELSE NULLIF($8, '')  END,
          email_principal        = CASE WHEN $9::text  IS NULL THEN email_principal        ELSE NULLIF($9, '')  END,
          logradouro             = CASE WHEN $10::text IS NULL THEN logradouro             ELSE NULLIF($10, '') END,
          numero                 = CASE WHEN $11::text IS NULL THEN numero                 ELSE NULLIF($11, '') END,
          complemento            = CASE WHEN $12::text IS NULL THEN complemento            ELSE NULLIF($12, '') END,
          bairro                 = CASE WHEN $13::text IS NULL THEN bairro                 ELSE NULLIF($13, '') END,
          municipio              = CASE WHEN $14::text IS NULL THEN municipio              ELSE NULLIF($14, '') END,
          uf                     = CASE WHEN $15::text IS NULL THEN uf                     ELSE NULLIF($15, '') END,
          cep                    = CASE WHEN $16::text IS NULL THEN cep                    ELSE NULLIF($16, '') END,
          observacoes            = CASE WHEN $17::text IS NULL THEN observacoes            ELSE NULLIF($17, '') END,
          tags                   = COALESCE($18, tags),
          favorito               = COALESCE($19, favorito),
          updated_at             = now()
        WHERE id = $1
        RETURNING *
        "#
    )
    .bind(id)
    .bind(fields::patch_text(b.nome_cadastro))
    .bind(fields::patch_text(b.tipo_cliente))
    .bind(fields::patch_digits(b.documento))
    .bind(fields::patch_text(b.razao_social))
    .bind(fields::patch_text(b.nome_fantasia))
    .bind(fields::patch_text(b.apelido_relacionamento))
    .bind(fields::patch_digits(b.telefone_principal))
    .bind(fields::patch_email(b.email_principal))
    .bind(fields::patch_text(b.logradouro))
    .bind(fields::patch_text(b.numero))
    .bind(fields::patch_text(b.complemento))
    .bind(fields::patch_text(b.bairro))
    .bind(fields::patch_text(b.municipio))
    .bind(fields::patch_text(b.uf))
    .bind(fields::patch_digits(b.cep))
    .bind(fields::patch_text(b.observacoes))
    .bind(b.tags)
    .bind(b.favorito)
    .fetch_one(pool)
    .await
}
