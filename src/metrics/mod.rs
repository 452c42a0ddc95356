// src/metrics/mod.rs
//
// Invoice / generation metrics: raw unit rows from one of the backend schema
// generations are mapped onto `RawUnitRecord`, then rolled up per client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod aggregate;
pub mod normalize;
pub mod payload;
pub mod sources;

pub use aggregate::{aggregate, AggregateOptions, AggregateReport, UnidentifiedClients};

pub const UNIDENTIFIED_CLIENT_LABEL: &str = "Cliente não identificado";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "injetado_zerado")]
    Zeroed,
    #[serde(rename = "sem_dados")]
    NoData,
}

/// Where the injected-energy reading of a unit came from.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedReading {
    /// A column holding a number or a number-ish string.
    Scalar(Value),
    /// An extraction payload (object or JSON text) holding the reading.
    Payload(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawUnitRecord {
    pub unit_id: String,
    pub client_document: Option<String>,
    pub client_name_from_record: Option<String>,
    pub client_name_from_registry: Option<String>,
    pub injected: InjectedReading,
    pub reference_month: Option<String>,
    pub projected_monthly_target: Option<f64>,
    pub plant_id: Option<String>,
    pub inverter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitEntry {
    #[serde(rename = "uc")]
    pub unit_id: String,
    #[serde(rename = "injetado")]
    pub injected: Option<f64>,
    pub status: UnitStatus,
    #[serde(rename = "mes_referente")]
    pub reference_month: Option<String>,
    #[serde(rename = "Plant_ID")]
    pub plant_id: Option<String>,
    #[serde(rename = "INVERSOR")]
    pub inverter_id: Option<String>,
    #[serde(rename = "meta_mensal")]
    pub projected_monthly_target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRollup {
    #[serde(rename = "cliente")]
    pub client_label: String,
    #[serde(rename = "chave")]
    pub group_key: String,
    #[serde(rename = "ucs")]
    pub units: Vec<UnitEntry>,
    #[serde(rename = "totalUCs")]
    pub total_units: usize,
    #[serde(rename = "totalInjetado")]
    pub total_injected: f64,
    #[serde(rename = "ucsComProblema")]
    pub problem_unit_count: usize,
    #[serde(rename = "porcentagemProblema")]
    pub problem_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalMetrics {
    #[serde(rename = "totalClientes")]
    pub total_clients: usize,
    #[serde(rename = "totalUCs")]
    pub total_units: usize,
    #[serde(rename = "ucsInjetadoOk")]
    pub units_ok: usize,
    #[serde(rename = "ucsInjetadoZero")]
    pub units_zeroed: usize,
    #[serde(rename = "ucsSemDados", skip_serializing_if = "Option::is_none")]
    pub units_no_data: Option<usize>,
    #[serde(rename = "taxaProblema")]
    pub global_problem_rate: f64,
    #[serde(rename = "totalInjetado")]
    pub total_injected: f64,
}

/// Cross-check between the rolled-up total and a direct sum over the source
/// table. Only the two-table source can compute it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    #[serde(rename = "totalFromFila")]
    pub total_from_source: f64,
    #[serde(rename = "totalsMatch")]
    pub totals_match: bool,
    #[serde(rename = "totalsDiff")]
    pub totals_diff: f64,
}

impl Reconciliation {
    pub fn new(aggregated_total: f64, total_from_source: f64) -> Self {
        Self {
            total_from_source,
            totals_match: (total_from_source - aggregated_total).abs() < 0.0001,
            totals_diff: aggregated_total - total_from_source,
        }
    }
}

/// Body of `GET /api/faturas/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResponse {
    #[serde(rename = "clientesAgrupados")]
    pub grouped_clients: Vec<ClientRollup>,
    #[serde(rename = "metricas")]
    pub metrics: GlobalMetrics,
    pub total: usize,
    #[serde(rename = "conciliacao", skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
}

impl From<AggregateReport> for MetricsResponse {
    fn from(report: AggregateReport) -> Self {
        Self {
            total: report.metrics.total_units,
            grouped_clients: report.rollups,
            metrics: report.metrics,
            reconciliation: None,
        }
    }
}

/// Percentage helper shared by the rollups: `0` when the divisor is empty.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(uc: &str, name: &str, injected: Value) -> RawUnitRecord {
        RawUnitRecord {
            unit_id: uc.to_string(),
            client_document: None,
            client_name_from_record: Some(name.to_string()),
            client_name_from_registry: None,
            injected: InjectedReading::Scalar(injected),
            reference_month: None,
            projected_monthly_target: None,
            plant_id: None,
            inverter_id: None,
        }
    }

    #[test]
    fn response_uses_dashboard_keys() {
        let report = aggregate(
            vec![record("1", "Ana", json!(5)), record("2", "Ana", json!(0))],
            &AggregateOptions::default(),
        );
        let body = serde_json::to_value(MetricsResponse::from(report)).unwrap();
        let mut keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["clientesAgrupados", "metricas", "total"]);
        assert_eq!(body["total"], 2);
        assert_eq!(body["clientesAgrupados"][0]["cliente"], "Ana");
        assert_eq!(body["clientesAgrupados"][0]["ucs"][1]["status"], "injetado_zerado");
        assert_eq!(body["metricas"]["ucsInjetadoZero"], 1);
    }

    #[test]
    fn reconciliation_is_serialized_when_present() {
        let report = aggregate(vec![record("1", "Ana", json!(5))], &AggregateOptions::default());
        let mut response = MetricsResponse::from(report);
        response.reconciliation = Some(Reconciliation::new(5.0, 7.5));

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(
            body["conciliacao"],
            json!({"totalFromFila": 7.5, "totalsMatch": false, "totalsDiff": -2.5})
        );
    }

    #[test]
    fn reconciliation_tolerates_rounding_noise() {
        let r = Reconciliation::new(0.1 + 0.2, 0.3);
        assert!(r.totals_match);
        assert!(r.totals_diff.abs() < 1e-9);

        let r = Reconciliation::new(10.0, 10.01);
        assert!(!r.totals_match);
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}
