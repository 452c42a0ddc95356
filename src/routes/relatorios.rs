// src/routes/relatorios.rs
//
// Delivery dashboard for the monthly reports (`relatorio_envios`).

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{query_as, query_scalar};

use crate::auth::ReportViewer;
use crate::error::AppResult;
use crate::models::RelatorioEnvioRow;
use crate::AppState;
use super::faturas::no_store;

pub const SENT_STATUS: &str = "✅ Enviado";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewedFilter {
    Todos,
    Visto,
    NaoVisto,
}

impl ViewedFilter {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("visto") => Self::Visto,
            Some("naoVisto") => Self::NaoVisto,
            _ => Self::Todos,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Todos => "todos",
            Self::Visto => "visto",
            Self::NaoVisto => "naoVisto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Todos,
    Enviado,
    NaoEnviado,
}

impl StatusFilter {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("enviado") => Self::Enviado,
            Some("naoEnviado") => Self::NaoEnviado,
            _ => Self::Todos,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Todos => "todos",
            Self::Enviado => "enviado",
            Self::NaoEnviado => "naoEnviado",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TvQ {
    pub viewed: Option<String>,
    pub status: Option<String>,
    pub busca: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContatoEnvio {
    pub id: i64,
    pub nome: String,
    pub telefone: String,
    pub empresa: Option<String>,
    pub cargo: Option<String>,
    /// `"sim"` when the recipient opened the report.
    pub viewed: Option<&'static str>,
    pub status_envio: Option<String>,
    pub interagido: bool,
    pub enviado: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryMetrics {
    pub enviados: usize,
    pub nao_enviados: usize,
    pub vistos: usize,
    pub nao_vistos: usize,
    pub taxa_envio: f64,
    pub taxa_interacao: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFilters {
    pub viewed: &'static str,
    pub status: &'static str,
    pub busca: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TvMetricsResponse {
    pub contatos: Vec<ContatoEnvio>,
    pub total: i64,
    pub total_filtrado: usize,
    pub metricas: DeliveryMetrics,
    pub filtros_aplicados: AppliedFilters,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

pub fn to_contato(row: RelatorioEnvioRow) -> ContatoEnvio {
    let enviado = row.status_envio.as_deref() == Some(SENT_STATUS);
    let visto = row.viewed == Some(true);
    ContatoEnvio {
        id: row.id,
        nome: row.nome_falado_dono.filter(|n| !n.is_empty()).unwrap_or_else(|| "Sem nome".into()),
        telefone: row.contato_celular.filter(|t| !t.is_empty()).unwrap_or_else(|| "-".into()),
        empresa: row.cliente_nome,
        cargo: row.contato_cargo,
        viewed: visto.then_some("sim"),
        status_envio: row.status_envio,
        // opened counts only once the report actually went out
        interagido: enviado && visto,
        enviado,
    }
}

pub fn summarize(contatos: &[ContatoEnvio]) -> DeliveryMetrics {
    let total = contatos.len();
    let enviados = contatos.iter().filter(|c| c.enviado).count();
    let vistos = contatos.iter().filter(|c| c.interagido).count();
    DeliveryMetrics {
        enviados,
        nao_enviados: total - enviados,
        vistos,
        nao_vistos: total - vistos,
        taxa_envio: rate(enviados, total),
        taxa_interacao: rate(vistos, enviados),
    }
}

// GET /api/tv/metrics
pub async fn get_tv_metrics(
    viewer: ReportViewer,
    State(state): State<AppState>,
    Query(q): Query<TvQ>,
) -> AppResult<Response> {
    let viewed = ViewedFilter::parse(q.viewed.as_deref());
    let status = StatusFilter::parse(q.status.as_deref());
    let busca = q.busca.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());

    let total: i64 = query_scalar(r#"SELECT COUNT(*) FROM public.relatorio_envios"#)
        .fetch_one(&state.pool).await?;

    let rows = query_as::<_, RelatorioEnvioRow>(
        r#"
        SELECT r.id::int8 AS id, r.nome_falado_dono, r.status_envio, r.viewed, r.enviado_em,
               r.created_at, r.cliente_id, r.contato_id,
               NULLIF(cl.razao_social, '') AS cliente_nome,
               NULLIF(ct.celular, '')      AS contato_celular,
               NULLIF(ct.cargo, '')        AS contato_cargo
        FROM public.relatorio_envios r
        LEFT JOIN public.crm_clientes cl ON cl.id = r.cliente_id
        LEFT JOIN public.crm_contatos ct ON ct.id = r.contato_id
        WHERE ($1 = 'todos'
               OR ($1 = 'visto'    AND r.viewed IS TRUE)
               OR ($1 = 'naoVisto' AND r.viewed IS NOT TRUE))
          AND ($2 = 'todos'
               OR ($2 = 'enviado'    AND r.status_envio = $4)
               OR ($2 = 'naoEnviado' AND r.status_envio IS DISTINCT FROM $4))
          AND ($3::text IS NULL OR r.nome_falado_dono ILIKE '%' || $3 || '%')
        ORDER BY r.created_at DESC
        "#
    )
    .bind(viewed.as_str())
    .bind(status.as_str())
    .bind(busca.as_deref())
    .bind(SENT_STATUS)
    .fetch_all(&state.pool).await?;

    let contatos: Vec<ContatoEnvio> = rows.into_iter().map(to_contato).collect();
    let metricas = summarize(&contatos);

    tracing::info!(
        user_id = %viewer.user.id,
        total,
        filtered = contatos.len(),
        "delivery metrics served"
    );

    let body = TvMetricsResponse {
        total_filtrado: contatos.len(),
        contatos,
        total,
        metricas,
        filtros_aplicados: AppliedFilters {
            viewed: viewed.as_str(),
            status: status.as_str(),
            busca,
        },
    };
    Ok(no_store(Json(body).into_response()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: i64, status: Option<&str>, viewed: Option<bool>) -> RelatorioEnvioRow {
        RelatorioEnvioRow {
            id,
            nome_falado_dono: Some(format!("Contato {id}")),
            status_envio: status.map(str::to_string),
            viewed,
            enviado_em: None,
            created_at: Utc::now(),
            cliente_id: None,
            contato_id: None,
            cliente_nome: None,
            contato_celular: Some("11999990000".into()),
            contato_cargo: None,
        }
    }

    #[test]
    fn viewed_without_sending_is_not_an_interaction() {
        let c = to_contato(row(1, Some("pendente"), Some(true)));
        assert!(!c.enviado);
        assert!(!c.interagido);
        assert_eq!(c.viewed, Some("sim"));

        let c = to_contato(row(2, Some(SENT_STATUS), Some(true)));
        assert!(c.enviado && c.interagido);
    }

    #[test]
    fn missing_name_and_phone_get_placeholders() {
        let mut r = row(3, None, None);
        r.nome_falado_dono = None;
        r.contato_celular = None;
        let c = to_contato(r);
        assert_eq!(c.nome, "Sem nome");
        assert_eq!(c.telefone, "-");
        assert_eq!(c.viewed, None);
    }

    #[test]
    fn rates_are_rounded_to_two_decimals() {
        let contatos: Vec<_> = vec![
            row(1, Some(SENT_STATUS), Some(true)),
            row(2, Some(SENT_STATUS), Some(false)),
            row(3, Some(SENT_STATUS), None),
            row(4, None, Some(true)),
            row(5, Some("❌ Erro"), None),
            row(6, None, None),
        ]
        .into_iter()
        .map(to_contato)
        .collect();

        let m = summarize(&contatos);
        assert_eq!(m.enviados, 3);
        assert_eq!(m.nao_enviados, 3);
        assert_eq!(m.vistos, 1);
        assert_eq!(m.nao_vistos, 5);
        assert_eq!(m.taxa_envio, 50.0);
        assert_eq!(m.taxa_interacao, 33.33);
    }

    #[test]
    fn empty_selection_has_zero_rates() {
        let m = summarize(&[]);
        assert_eq!(m.taxa_envio, 0.0);
        assert_eq!(m.taxa_interacao, 0.0);
    }

    #[test]
    fn unknown_filters_fall_back_to_all() {
        assert_eq!(ViewedFilter::parse(Some("naoVisto")), ViewedFilter::NaoVisto);
        assert_eq!(ViewedFilter::parse(Some("qualquer")), ViewedFilter::Todos);
        assert_eq!(StatusFilter::parse(None), StatusFilter::Todos);
        assert_eq!(StatusFilter::parse(Some("enviado")).as_str(), "enviado");
    }
}
