// src/routes/tecnica.rs

use axum::{extract::{Path, State}, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::query_as;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{map_db_conflict, AppResult};
use crate::models::{ClienteComTecnica, ClienteTecnica};
use crate::{fields, AppState};

// numeric/smallint columns are cast so they decode as f64/i32
const TECNICA_COLUMNS: &str = r#"
    id, cliente_id, documento, nome_planta, modalidade, classificacao, tipo_local,
    possui_internet, data_install, venc_garantia, garantia_extendida,
    potencia_usina_kwp::float8 AS potencia_usina_kwp,
    quant_inverter::int4 AS quant_inverter, marca_inverter, mod_inverter, serie_inverter,
    quant_modulos::int4 AS quant_modulos, marca_modulos, mod_modulos
"#;

#[derive(Debug, Default, Deserialize)]
pub struct TecnicaBody {
    pub cliente_id: Option<Uuid>,
    pub documento: Option<String>,
    pub nome_planta: Option<String>,
    pub modalidade: Option<String>,
    pub classificacao: Option<String>,
    pub tipo_local: Option<String>,
    pub possui_internet: Option<bool>,
    pub data_install: Option<NaiveDate>,
    pub venc_garantia: Option<NaiveDate>,
    pub garantia_extendida: Option<String>,
    pub potencia_usina_kwp: Option<f64>,
    pub quant_inverter: Option<i32>,
    pub marca_inverter: Option<String>,
    pub mod_inverter: Option<String>,
    pub serie_inverter: Option<String>,
    pub quant_modulos: Option<i32>,
    pub marca_modulos: Option<String>,
    pub mod_modulos: Option<String>,
}

// GET /api/v1/tecnica
pub async fn list_tecnica(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ClienteComTecnica>>> {
    let rows = query_as::<_, ClienteComTecnica>(
        r#"
        SELECT c.id AS cliente_id, c.razao_social, c.documento, c.telefone_principal,
               c.email_principal, c.updated_at,
               t.id AS tecnica_id, t.nome_planta, t.modalidade, t.classificacao, t.tipo_local,
               COALESCE(t.possui_internet, false) AS possui_internet,
               t.data_install, t.venc_garantia, t.garantia_extendida,
               t.potencia_usina_kwp::float8 AS potencia_usina_kwp,
               t.quant_inverter::int4 AS quant_inverter, t.marca_inverter, t.mod_inverter, t.serie_inverter,
               t.quant_modulos::int4 AS quant_modulos, t.marca_modulos, t.mod_modulos
        FROM public.crm_clientes c
        LEFT JOIN LATERAL (
            SELECT * FROM public.crm_clientes_tecnica x
            WHERE x.cliente_id = c.id
            ORDER BY x.id
            LIMIT 1
        ) t ON true
        ORDER BY c.updated_at DESC
        "#
    )
    .fetch_all(&state.pool).await?;
    Ok(Json(rows))
}

// GET /api/v1/tecnica/:id
pub async fn get_tecnica(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ClienteTecnica>> {
    let sql = format!("SELECT {TECNICA_COLUMNS} FROM public.crm_clientes_tecnica WHERE id = $1");
    let row = query_as::<_, ClienteTecnica>(&sql)
        .bind(id)
        .fetch_one(&state.pool).await?;
    Ok(Json(row))
}

// GET /api/v1/tecnica/documento/:documento
pub async fn get_tecnica_by_documento(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(documento): Path<String>,
) -> AppResult<Json<ClienteTecnica>> {
    let sql = format!(
        "SELECT {TECNICA_COLUMNS} FROM public.crm_clientes_tecnica WHERE documento = $1 LIMIT 1"
    );
    let row = query_as::<_, ClienteTecnica>(&sql)
        .bind(fields::digits(Some(documento)))
        .fetch_one(&state.pool).await?;
    Ok(Json(row))
}

// POST /api/v1/tecnica
pub async fn create_tecnica(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(b): Json<TecnicaBody>,
) -> AppResult<Json<ClienteTecnica>> {
    let sql = format!(
        r#"
        INSERT INTO public.crm_clientes_tecnica
          (cliente_id, documento, nome_planta, modalidade, classificacao, tipo_local,
           possui_internet, data_install, venc_garantia, garantia_extendida, potencia_usina_kwp,
           quant_inverter, marca_inverter, mod_inverter, serie_inverter,
           quant_modulos, marca_modulos, mod_modulos)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
        RETURNING {TECNICA_COLUMNS}
        "#
    );
    let row = query_as::<_, ClienteTecnica>(&sql)
        .bind(b.cliente_id)
        .bind(fields::digits(b.documento))
        .bind(fields::text(b.nome_planta))
        .bind(fields::text(b.modalidade))
        .bind(fields::text(b.classificacao))
        .bind(fields::text(b.tipo_local))
        .bind(b.possui_internet.unwrap_or(false))
        .bind(b.data_install)
        .bind(b.venc_garantia)
        .bind(fields::text(b.garantia_extendida))
        .bind(b.potencia_usina_kwp)
        .bind(b.quant_inverter)
        .bind(fields::text(b.marca_inverter))
        .bind(fields::text(b.mod_inverter))
        .bind(fields::text(b.serie_inverter))
        .bind(b.quant_modulos)
        .bind(fields::text(b.marca_modulos))
        .bind(fields::text(b.mod_modulos))
        .fetch_one(&state.pool)
        .await
        .map_err(|e| map_db_conflict(e, "Este cliente já possui dados técnicos"))?;

    tracing::info!(tecnica_id = %row.id, cliente_id = %row.cliente_id, "tecnica created");
    Ok(Json(row))
}

// PATCH /api/v1/tecnica/:id
pub async fn patch_tecnica(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(b): Json<TecnicaBody>,
) -> AppResult<Json<ClienteTecnica>> {
    let sql = format!(
        r#"
        UPDATE public.crm_clientes_tecnica SET
          documento          = CASE WHEN $2::text  IS NULL THEN documento          ELSE NULLIF($2, '')  END,
          nome_planta        = CASE WHEN $3::text  IS NULL THEN nome_planta        ELSE NULLIF($3, '')  END,
          modalidade         = CASE WHEN $4::text  IS NULL THEN modalidade         ELSE NULLIF($4, '')  END,
          classificacao      = CASE WHEN $5::text  IS NULL THEN classificacao      ELSE NULLIF($5, '')  END,
          tipo_local         = CASE WHEN $6::text  IS NULL THEN tipo_local         ELSE NULLIF($6, '')  END,
          possui_internet    = COALESCE($7, possui_internet),
          data_install       = COALESCE($8, data_install),
          venc_garantia      = COALESCE($9, venc_garantia),
          garantia_extendida = CASE WHEN $10::text IS NULL THEN garantia_extendida ELSE NULLIF($10, '') END,
          potencia_usina_kwp = COALESCE($11, potencia_usina_kwp),
          quant_inverter     = COALESCE($12, quant_inverter),
          marca_inverter     = CASE WHEN $13::text IS NULL THEN marca_inverter     ELSE NULLIF($13, '') END,
          mod_inverter       = CASE WHEN $14::text IS NULL THEN mod_inverter       ELSE NULLIF($14, '') END,
          serie_inverter     = CASE WHEN $15::text IS NULL THEN serie_inverter     ELSE NULLIF($15, '') END,
          quant_modulos      = COALESCE($16, quant_modulos),
          marca_modulos      = CASE WHEN $17::text IS NULL THEN marca_modulos      ELSE NULLIF($17, '') END,
          mod_modulos        = CASE WHEN $18::text IS NULL THEN mod_modulos        ELSE NULLIF($18, '') END
        WHERE id = $1
        RETURNING {TECNICA_COLUMNS}
        "#
    );
    let row = query_as::<_, ClienteTecnica>(&sql)
        .bind(id)
        .bind(fields::patch_digits(b.documento))
        .bind(fields::patch_text(b.nome_planta))
        .bind(fields::patch_text(b.modalidade))
        .bind(fields::patch_text(b.classificacao))
        .bind(fields::patch_text(b.tipo_local))
        .bind(b.possui_internet)
        .bind(b.data_install)
        .bind(b.venc_garantia)
        .bind(fields::patch_text(b.garantia_extendida))
        .bind(b.potencia_usina_kwp)
        .bind(b.quant_inverter)
        .bind(fields::patch_text(b.marca_inverter))
        .bind(fields::patch_text(b.mod_inverter))
        .bind(fields::patch_text(b.serie_inverter))
        .bind(b.quant_modulos)
        .bind(fields::patch_text(b.marca_modulos))
        .bind(fields::patch_text(b.mod_modulos))
        .fetch_one(&state.pool).await?;
    Ok(Json(row))
}
