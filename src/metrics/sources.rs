// src/metrics/sources.rs
//
// One adapter per schema generation of the invoice data. Rows are read as
// `to_jsonb(row)` so that columns which changed type between generations
// (text vs numeric) all deserialize into the same loose shapes.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use super::normalize::{digits_only, parse_number, try_parse_number};
use super::{InjectedReading, RawUnitRecord};

/// Which backend shape feeds the invoice metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsSource {
    /// Pre-joined `view_faturas_completa`.
    View,
    /// `fila_extracao` joined in memory with `growatt`.
    Joined,
    /// `fila_extracao` invoice rows with the reading inside `dados_extraidos`.
    #[default]
    Payload,
}

impl MetricsSource {
    pub fn supports_no_data(self) -> bool {
        matches!(self, MetricsSource::Payload)
    }
}

impl std::str::FromStr for MetricsSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(Self::View),
            "joined" => Ok(Self::Joined),
            "payload" => Ok(Self::Payload),
            other => Err(format!("unknown metrics source '{other}'")),
        }
    }
}

// ───────────────────────────────────────
// Row shapes
// ───────────────────────────────────────
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewRow {
    #[serde(rename = "UC_Final")]
    pub uc_final: Option<Value>,
    pub cliente_fatura: Option<String>,
    pub cliente_cadastro: Option<String>,
    pub cpf_cnpj: Option<String>,
    pub mes_referente: Option<String>,
    pub injetado: Option<Value>,
    #[serde(rename = "Plant_ID")]
    pub plant_id: Option<Value>,
    #[serde(rename = "INVERSOR")]
    pub inversor: Option<Value>,
    pub meta_mensal: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilaRow {
    #[serde(rename = "UC")]
    pub uc: Option<Value>,
    pub cliente: Option<String>,
    pub cnpj: Option<String>,
    pub injetado: Option<Value>,
    pub mes_referente: Option<String>,
    pub dados_extraidos: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GrowattRow {
    #[serde(rename = "UNIDADES_CONSUMIDORAS")]
    pub unidades_consumidoras: Option<Value>,
    #[serde(rename = "CLIENTE")]
    pub cliente: Option<String>,
    #[serde(rename = "Plant_ID")]
    pub plant_id: Option<Value>,
    #[serde(rename = "INVERSOR")]
    pub inversor: Option<Value>,
    #[serde(rename = "Geracao_Ac_Mensal")]
    pub geracao_ac_mensal: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistryClient {
    pub documento: Option<String>,
    pub razao_social: Option<String>,
    pub nome_cadastro: Option<String>,
}

/// Records ready for aggregation, plus the direct table sum when the source
/// can provide one.
#[derive(Debug)]
pub struct LoadedUnits {
    pub records: Vec<RawUnitRecord>,
    pub total_from_source: Option<f64>,
}

// ───────────────────────────────────────
// Loading
// ───────────────────────────────────────
pub async fn load_units(pool: &PgPool, source: MetricsSource) -> Result<LoadedUnits, sqlx::Error> {
    match source {
        MetricsSource::View => {
            let rows: Vec<ViewRow> =
                fetch_json_rows(pool, "SELECT to_jsonb(v) FROM public.view_faturas_completa v").await?;
            tracing::info!(rows = rows.len(), "loaded view_faturas_completa");
            Ok(LoadedUnits { records: from_view_rows(rows), total_from_source: None })
        }
        MetricsSource::Joined => {
            let (filas, growatt) = tokio::try_join!(
                fetch_json_rows::<FilaRow>(pool, "SELECT to_jsonb(f) FROM public.fila_extracao f"),
                fetch_json_rows::<GrowattRow>(pool, "SELECT to_jsonb(g) FROM public.growatt g"),
            )?;
            tracing::info!(filas = filas.len(), growatt = growatt.len(), "loaded fila_extracao + growatt");
            let total = sum_fila_injected(&filas);
            Ok(LoadedUnits {
                records: from_joined_rows(filas, growatt),
                total_from_source: Some(total),
            })
        }
        MetricsSource::Payload => {
            let (filas, registry) = tokio::try_join!(
                fetch_json_rows::<FilaRow>(
                    pool,
                    "SELECT to_jsonb(f) FROM public.fila_extracao f WHERE f.tipo = 'fatura'"
                ),
                fetch_json_rows::<RegistryClient>(
                    pool,
                    r#"SELECT to_jsonb(c) FROM (
                         SELECT documento, razao_social, nome_cadastro
                         FROM public.crm_clientes WHERE documento IS NOT NULL
                       ) c"#
                ),
            )?;
            tracing::info!(filas = filas.len(), clientes = registry.len(), "loaded invoice payload rows");
            Ok(LoadedUnits { records: from_payload_rows(filas, registry), total_from_source: None })
        }
    }
}

async fn fetch_json_rows<T: DeserializeOwned>(pool: &PgPool, sql: &str) -> Result<Vec<T>, sqlx::Error> {
    let rows: Vec<(Value,)> = sqlx::query_as(sql).fetch_all(pool).await?;
    rows.into_iter()
        .map(|(row,)| serde_json::from_value(row).map_err(|e| sqlx::Error::Decode(Box::new(e))))
        .collect()
}

// ───────────────────────────────────────
// Adapters
// ───────────────────────────────────────
pub fn from_view_rows(rows: Vec<ViewRow>) -> Vec<RawUnitRecord> {
    rows.into_iter()
        .map(|row| RawUnitRecord {
            unit_id: text(&row.uc_final).unwrap_or_default(),
            client_document: digits_only(row.cpf_cnpj.as_deref()),
            client_name_from_record: row.cliente_fatura,
            client_name_from_registry: row.cliente_cadastro,
            injected: InjectedReading::Scalar(row.injetado.unwrap_or(Value::Null)),
            reference_month: row.mes_referente,
            projected_monthly_target: number(&row.meta_mensal),
            plant_id: text(&row.plant_id),
            inverter_id: text(&row.inversor),
        })
        .collect()
}

/// `fila_extracao` is the canonical side: every queued unit yields a record,
/// `growatt` only contributes registry name and plant details. A unit id seen
/// twice in either table keeps its last row.
pub fn from_joined_rows(filas: Vec<FilaRow>, growatt: Vec<GrowattRow>) -> Vec<RawUnitRecord> {
    let mut plants: HashMap<String, GrowattRow> = HashMap::new();
    for g in growatt {
        if let Some(key) = text(&g.unidades_consumidoras) {
            plants.insert(key, g);
        }
    }

    let mut queue: HashMap<String, FilaRow> = HashMap::new();
    for f in filas {
        if let Some(key) = text(&f.uc) {
            queue.insert(key, f);
        }
    }

    queue
        .into_iter()
        .map(|(uc, f)| {
            let plant = plants.get(&uc);
            RawUnitRecord {
                client_document: digits_only(f.cnpj.as_deref()),
                client_name_from_record: f.cliente,
                client_name_from_registry: plant.and_then(|g| g.cliente.clone()),
                injected: InjectedReading::Scalar(f.injetado.unwrap_or(Value::Null)),
                reference_month: f.mes_referente,
                projected_monthly_target: plant.and_then(|g| number(&g.geracao_ac_mensal)),
                plant_id: plant.and_then(|g| text(&g.plant_id)),
                inverter_id: plant.and_then(|g| text(&g.inversor)),
                unit_id: uc,
            }
        })
        .collect()
}

pub fn from_payload_rows(filas: Vec<FilaRow>, registry: Vec<RegistryClient>) -> Vec<RawUnitRecord> {
    let names: HashMap<String, String> = registry
        .into_iter()
        .filter_map(|c| {
            let doc = digits_only(c.documento.as_deref())?;
            let name = [c.razao_social, c.nome_cadastro]
                .into_iter()
                .flatten()
                .find(|n| !n.trim().is_empty())?;
            Some((doc, name))
        })
        .collect();

    filas
        .into_iter()
        .map(|f| {
            let document = digits_only(f.cnpj.as_deref());
            RawUnitRecord {
                unit_id: text(&f.uc).unwrap_or_default(),
                client_name_from_registry: document.as_ref().and_then(|d| names.get(d).cloned()),
                client_document: document,
                client_name_from_record: f.cliente,
                injected: InjectedReading::Payload(f.dados_extraidos.unwrap_or(Value::Null)),
                reference_month: f.mes_referente,
                projected_monthly_target: None,
                plant_id: None,
                inverter_id: None,
            }
        })
        .collect()
}

/// Direct sum of `fila_extracao.injetado`. Positive readings only, like the
/// rollup totals.
pub fn sum_fila_injected(filas: &[FilaRow]) -> f64 {
    filas
        .iter()
        .filter_map(|f| f.injetado.as_ref())
        .filter(|v| !v.is_null())
        .map(parse_number)
        .filter(|v| *v > 0.0)
        .sum()
}

fn text(value: &Option<Value>) -> Option<String> {
    let s = match value.as_ref()? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn number(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(try_parse_number)
}
