// src/routes/vinculos.rs
//
// Client ↔ contact links. Each link owns one `relatorio_envios` row whose
// `nome_falado_dono` tells the report sender whether it is talking to the
// principal contact or to a secondary one.

use axum::{extract::{Path, State}, Json};
use serde::Deserialize;
use sqlx::{query, query_as, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{map_db_conflict, AppResult};
use crate::models::{Deleted, Vinculo, VinculoComCliente, VinculoComContato};
use crate::{fields, AppState};

pub const SECONDARY_CONTACT_SUFFIX: &str = " (Contato-Vinculado)";

#[derive(Debug, Deserialize)]
pub struct CreateVinculoBody {
    pub cliente_id: Uuid,
    pub contato_id: Uuid,
    #[serde(default)] pub contato_principal: bool,
    pub cargo_no_cliente: Option<String>,
    pub observacoes_relacionamento: Option<String>,
}

pub fn spoken_owner_name(nome_completo: &str, principal: bool) -> String {
    let nome = nome_completo.trim();
    if principal {
        nome.to_string()
    } else {
        format!("{nome}{SECONDARY_CONTACT_SUFFIX}")
    }
}

// GET /api/v1/clientes/:id/contatos
pub async fn list_by_cliente(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(cliente_id): Path<Uuid>,
) -> AppResult<Json<Vec<VinculoComContato>>> {
    let rows = links_for_cliente(&state.pool, cliente_id).await?;
    Ok(Json(rows))
}

// GET /api/v1/contatos/:id/clientes
pub async fn list_by_contato(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(contato_id): Path<Uuid>,
) -> AppResult<Json<Vec<VinculoComCliente>>> {
    let rows = query_as::<_, VinculoComCliente>(
        r#"
        SELECT v.id, v.cliente_id, v.contato_id, v.contato_principal, v.cargo_no_cliente, v.created_at,
               c.razao_social AS cliente_razao_social,
               c.tipo_cliente AS cliente_tipo_cliente
        FROM public.crm_clientes_contatos v
        JOIN public.crm_clientes c ON c.id = v.cliente_id
        WHERE v.contato_id = $1
        ORDER BY v.created_at
        "#
    )
    .bind(contato_id)
    .fetch_all(&state.pool).await?;
    Ok(Json(rows))
}

// POST /api/v1/vinculos
pub async fn create_vinculo(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(b): Json<CreateVinculoBody>,
) -> AppResult<Json<Vinculo>> {
    let vinculo = query_as::<_, Vinculo>(
        r#"
        INSERT INTO public.crm_clientes_contatos
          (cliente_id, contato_id, contato_principal, cargo_no_cliente, observacoes_relacionamento)
        VALUES ($1,$2,$3,$4,$5)
        RETURNING *
        "#
    )
    .bind(b.cliente_id)
    .bind(b.contato_id)
    .bind(b.contato_principal)
    .bind(fields::text(b.cargo_no_cliente))
    .bind(fields::text(b.observacoes_relacionamento))
    .fetch_one(&state.pool)
    .await
    .map_err(|e| map_db_conflict(e, "Este contato já está vinculado a este cliente"))?;

    // the link stands even if the delivery row cannot be created
    if let Err(e) = ensure_delivery_row(&state.pool, &vinculo).await {
        tracing::warn!(vinculo_id = %vinculo.id, error = %e, "could not create relatorio_envios row");
    }

    Ok(Json(vinculo))
}

// DELETE /api/v1/vinculos/:id
pub async fn delete_vinculo(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Deleted>> {
    let mut tx = state.pool.begin().await?;

    let removed: Option<(Uuid, Uuid)> = query_as(
        r#"DELETE FROM public.crm_clientes_contatos WHERE id = $1 RETURNING cliente_id, contato_id"#
    )
    .bind(id)
    .fetch_optional(&mut *tx).await?;

    if let Some((cliente_id, contato_id)) = removed {
        query(r#"DELETE FROM public.relatorio_envios WHERE cliente_id = $1 AND contato_id = $2"#)
            .bind(cliente_id)
            .bind(contato_id)
            .execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(Json(Deleted { deleted: removed.is_some() }))
}

// POST /api/v1/vinculos/:id/principal
pub async fn set_principal(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<VinculoComContato>>> {
    let mut tx = state.pool.begin().await?;

    let (cliente_id,): (Uuid,) =
        query_as(r#"SELECT cliente_id FROM public.crm_clientes_contatos WHERE id = $1"#)
            .bind(id)
            .fetch_one(&mut *tx).await?;

    // exactly one principal per client
    query(
        r#"UPDATE public.crm_clientes_contatos SET contato_principal = (id = $1) WHERE cliente_id = $2"#
    )
    .bind(id)
    .bind(cliente_id)
    .execute(&mut *tx).await?;

    rename_delivery_owners(&mut tx, cliente_id).await?;
    tx.commit().await?;

    tracing::info!(vinculo_id = %id, cliente_id = %cliente_id, "principal contact changed");
    let rows = links_for_cliente(&state.pool, cliente_id).await?;
    Ok(Json(rows))
}

async fn links_for_cliente(pool: &PgPool, cliente_id: Uuid) -> Result<Vec<VinculoComContato>, sqlx::Error> {
    query_as::<_, VinculoComContato>(
        r#"
        SELECT v.id, v.cliente_id, v.contato_id, v.contato_principal, v.cargo_no_cliente,
               v.observacoes_relacionamento, v.created_at,
               c.nome_completo AS contato_nome_completo,
               c.cargo         AS contato_cargo,
               c.celular       AS contato_celular,
               c.email         AS contato_email
        FROM public.crm_clientes_contatos v
        JOIN public.crm_contatos c ON c.id = v.contato_id
        WHERE v.cliente_id = $1
        ORDER BY v.contato_principal DESC, c.nome_completo
        "#
    )
    .bind(cliente_id)
    .fetch_all(pool)
    .await
}

async fn ensure_delivery_row(pool: &PgPool, v: &Vinculo) -> Result<(), sqlx::Error> {
    let (exists,): (bool,) = query_as(
        r#"SELECT EXISTS(SELECT 1 FROM public.relatorio_envios WHERE cliente_id = $1 AND contato_id = $2)"#
    )
    .bind(v.cliente_id)
    .bind(v.contato_id)
    .fetch_one(pool).await?;
    if exists {
        return Ok(());
    }

    let (nome,): (String,) = query_as(r#"SELECT nome_completo FROM public.crm_contatos WHERE id = $1"#)
        .bind(v.contato_id)
        .fetch_one(pool).await?;

    query(
        r#"
        INSERT INTO public.relatorio_envios (cliente_id, contato_id, nome_falado_dono, status_envio, viewed)
        VALUES ($1, $2, $3, 'pendente', false)
        "#
    )
    .bind(v.cliente_id)
    .bind(v.contato_id)
    .bind(spoken_owner_name(&nome, v.contato_principal))
    .execute(pool).await?;
    Ok(())
}

async fn rename_delivery_owners(
    tx: &mut Transaction<'_, Postgres>,
    cliente_id: Uuid,
) -> Result<(), sqlx::Error> {
    let links: Vec<(Uuid, bool, String)> = query_as(
        r#"
        SELECT v.contato_id, v.contato_principal, c.nome_completo
        FROM public.crm_clientes_contatos v
        JOIN public.crm_contatos c ON c.id = v.contato_id
        WHERE v.cliente_id = $1
        "#
    )
    .bind(cliente_id)
    .fetch_all(&mut **tx).await?;

    for (contato_id, principal, nome) in links {
        query(
            r#"UPDATE public.relatorio_envios SET nome_falado_dono = $3 WHERE cliente_id = $1 AND contato_id = $2"#
        )
        .bind(cliente_id)
        .bind(contato_id)
        .bind(spoken_owner_name(&nome, principal))
        .execute(&mut **tx).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_contacts_are_marked() {
        assert_eq!(spoken_owner_name(" Joana Lima ", true), "Joana Lima");
        assert_eq!(spoken_owner_name("Joana Lima", false), "Joana Lima (Contato-Vinculado)");
    }
}
