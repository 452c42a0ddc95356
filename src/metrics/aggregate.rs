// src/metrics/aggregate.rs

use std::collections::HashMap;

use super::normalize::{digits_only, parse_number};
use super::payload::extract_payload;
use super::{
    percentage, ClientRollup, GlobalMetrics, InjectedReading, RawUnitRecord, UnitEntry,
    UnitStatus, UNIDENTIFIED_CLIENT_LABEL,
};

/// What to do with records that carry no client name at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnidentifiedClients {
    /// Group them under [`UNIDENTIFIED_CLIENT_LABEL`].
    #[default]
    Placeholder,
    /// Leave them out of the report.
    Skip,
}

impl std::str::FromStr for UnidentifiedClients {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown unidentified-clients policy '{other}' (placeholder|skip)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    pub unidentified: UnidentifiedClients,
    /// Report `ucsSemDados`; only meaningful for payload-backed sources.
    pub report_no_data: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub rollups: Vec<ClientRollup>,
    pub metrics: GlobalMetrics,
}

/// Groups unit records per client and computes rollups plus global figures.
///
/// Never fails: a record whose reading cannot be interpreted degrades to a
/// zeroed or no-data unit. Records with a blank unit id are dropped.
pub fn aggregate(records: Vec<RawUnitRecord>, options: &AggregateOptions) -> AggregateReport {
    let mut records: Vec<RawUnitRecord> = records
        .into_iter()
        .filter(|r| !r.unit_id.trim().is_empty())
        .collect();
    records.sort_by(|a, b| a.unit_id.trim().cmp(b.unit_id.trim()));

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rollups: Vec<ClientRollup> = Vec::new();

    for record in records {
        let name = resolve_name(&record);
        if name.is_none() && options.unidentified == UnidentifiedClients::Skip {
            tracing::debug!(uc = %record.unit_id, "skipping unit without client name");
            continue;
        }
        let label = name.unwrap_or_else(|| UNIDENTIFIED_CLIENT_LABEL.to_string());
        let key = match digits_only(record.client_document.as_deref()) {
            Some(doc) => doc,
            None => format!("sem-documento:{label}"),
        };

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            rollups.push(ClientRollup {
                client_label: label.clone(),
                group_key: key,
                units: Vec::new(),
                total_units: 0,
                total_injected: 0.0,
                problem_unit_count: 0,
                problem_rate: 0.0,
            });
            rollups.len() - 1
        });
        let rollup = &mut rollups[slot];

        // a documented client first seen without a name picks one up later
        if rollup.client_label == UNIDENTIFIED_CLIENT_LABEL && label != UNIDENTIFIED_CLIENT_LABEL {
            rollup.client_label = label;
        }

        let entry = unit_entry(record);
        rollup.total_units += 1;
        if let Some(v) = entry.injected.filter(|v| *v > 0.0) {
            rollup.total_injected += v;
        }
        if entry.status == UnitStatus::Zeroed {
            rollup.problem_unit_count += 1;
        }
        rollup.units.push(entry);
    }

    for rollup in &mut rollups {
        rollup.problem_rate = percentage(rollup.problem_unit_count, rollup.total_units);
    }

    rollups.sort_by(|a, b| {
        b.problem_unit_count
            .cmp(&a.problem_unit_count)
            .then_with(|| a.client_label.cmp(&b.client_label))
    });

    let metrics = global_metrics(&rollups, options);
    AggregateReport { rollups, metrics }
}

fn resolve_name(record: &RawUnitRecord) -> Option<String> {
    [&record.client_name_from_registry, &record.client_name_from_record]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn unit_entry(record: RawUnitRecord) -> UnitEntry {
    let mut reference_month = record.reference_month;
    let (injected, status) = match &record.injected {
        InjectedReading::Scalar(raw) => {
            let value = parse_number(raw);
            let status = if value == 0.0 { UnitStatus::Zeroed } else { UnitStatus::Ok };
            (Some(value), status)
        }
        InjectedReading::Payload(raw) => {
            let reading = extract_payload(raw);
            if reference_month.is_none() {
                reference_month = reading.reference_month;
            }
            (reading.injected, reading.status)
        }
    };

    UnitEntry {
        unit_id: record.unit_id.trim().to_string(),
        injected,
        status,
        reference_month,
        plant_id: record.plant_id,
        inverter_id: record.inverter_id,
        projected_monthly_target: record.projected_monthly_target,
    }
}

fn global_metrics(rollups: &[ClientRollup], options: &AggregateOptions) -> GlobalMetrics {
    let units = || rollups.iter().flat_map(|r| r.units.iter());
    let count = |status: UnitStatus| units().filter(|u| u.status == status).count();

    let total_units = units().count();
    let units_zeroed = count(UnitStatus::Zeroed);

    GlobalMetrics {
        total_clients: rollups.len(),
        total_units,
        units_ok: count(UnitStatus::Ok),
        units_zeroed,
        units_no_data: options.report_no_data.then(|| count(UnitStatus::NoData)),
        global_problem_rate: percentage(units_zeroed, total_units),
        total_injected: units()
            .filter_map(|u| u.injected)
            .filter(|v| *v > 0.0)
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn scalar(uc: &str, doc: Option<&str>, name: Option<&str>, injected: Value) -> RawUnitRecord {
        RawUnitRecord {
            unit_id: uc.to_string(),
            client_document: doc.map(str::to_string),
            client_name_from_record: name.map(str::to_string),
            client_name_from_registry: None,
            injected: InjectedReading::Scalar(injected),
            reference_month: None,
            projected_monthly_target: None,
            plant_id: None,
            inverter_id: None,
        }
    }

    fn payload(uc: &str, doc: Option<&str>, name: Option<&str>, body: Value) -> RawUnitRecord {
        RawUnitRecord {
            injected: InjectedReading::Payload(body),
            ..scalar(uc, doc, name, Value::Null)
        }
    }

    #[test]
    fn same_document_rolls_into_one_client() {
        let records = vec![
            scalar("100", Some("12345678000190"), Some("Padaria Sol"), json!(100)),
            scalar("101", Some("12.345.678/0001-90"), Some("Padaria Sol"), json!("0")),
        ];
        let report = aggregate(records, &AggregateOptions::default());

        assert_eq!(report.rollups.len(), 1);
        let r = &report.rollups[0];
        assert_eq!(r.group_key, "12345678000190");
        assert_eq!(r.total_units, 2);
        assert_eq!(r.total_injected, 100.0);
        assert_eq!(r.problem_unit_count, 1);
        assert_eq!(r.problem_rate, 50.0);
    }

    #[test]
    fn blank_unit_ids_are_excluded_everywhere() {
        let records = vec![
            scalar("  ", Some("1"), Some("A"), json!(0)),
            scalar("", Some("1"), Some("A"), json!(5)),
            scalar("7", Some("1"), Some("A"), json!(5)),
        ];
        let report = aggregate(records, &AggregateOptions::default());
        assert_eq!(report.metrics.total_units, 1);
        assert_eq!(report.metrics.units_zeroed, 0);
        assert_eq!(report.metrics.total_injected, 5.0);
        assert_eq!(report.rollups[0].units.len(), 1);
    }

    #[test]
    fn registry_name_beats_record_name() {
        let mut rec = scalar("1", None, Some("NOME FATURA"), json!(1));
        rec.client_name_from_registry = Some("Nome Cadastro".into());
        let report = aggregate(vec![rec], &AggregateOptions::default());
        assert_eq!(report.rollups[0].client_label, "Nome Cadastro");
        assert_eq!(report.rollups[0].group_key, "sem-documento:Nome Cadastro");
    }

    #[test]
    fn undocumented_clients_with_different_names_stay_apart() {
        let records = vec![
            scalar("1", None, Some("Ana"), json!(1)),
            scalar("2", None, Some("Bruno"), json!(1)),
            scalar("3", Some(""), Some("Ana"), json!(1)),
        ];
        let report = aggregate(records, &AggregateOptions::default());
        assert_eq!(report.rollups.len(), 2);
        let ana = report.rollups.iter().find(|r| r.client_label == "Ana").unwrap();
        assert_eq!(ana.total_units, 2);
    }

    #[test]
    fn unidentified_clients_follow_policy() {
        let records = || {
            vec![
                scalar("1", None, None, json!(1)),
                scalar("2", None, Some("   "), json!(0)),
                scalar("3", None, Some("Carla"), json!(2)),
            ]
        };

        let grouped = aggregate(records(), &AggregateOptions::default());
        assert_eq!(grouped.metrics.total_units, 3);
        let placeholder = grouped
            .rollups
            .iter()
            .find(|r| r.client_label == UNIDENTIFIED_CLIENT_LABEL)
            .unwrap();
        assert_eq!(placeholder.total_units, 2);

        let skipped = aggregate(
            records(),
            &AggregateOptions { unidentified: UnidentifiedClients::Skip, ..Default::default() },
        );
        assert_eq!(skipped.metrics.total_units, 1);
        assert_eq!(skipped.rollups[0].client_label, "Carla");
    }

    #[test]
    fn documented_placeholder_picks_up_a_later_name() {
        let records = vec![
            scalar("1", Some("999"), None, json!(1)),
            scalar("2", Some("999"), Some("Dona Maria"), json!(1)),
        ];
        let report = aggregate(records, &AggregateOptions::default());
        assert_eq!(report.rollups.len(), 1);
        assert_eq!(report.rollups[0].client_label, "Dona Maria");
    }

    #[test]
    fn rollups_sorted_by_problems_then_label() {
        let records = vec![
            scalar("1", None, Some("Zeta"), json!(0)),
            scalar("2", None, Some("Beta"), json!(0)),
            scalar("3", None, Some("Alfa"), json!(10)),
            scalar("4", None, Some("Zeta"), json!(0)),
            scalar("5", None, Some("Beta"), json!(3)),
        ];
        let report = aggregate(records, &AggregateOptions::default());
        let labels: Vec<&str> = report.rollups.iter().map(|r| r.client_label.as_str()).collect();
        assert_eq!(labels, ["Zeta", "Beta", "Alfa"]);
    }

    #[test]
    fn equal_problem_counts_fall_back_to_label_order() {
        let records = vec![
            scalar("1", None, Some("Solar Norte"), json!(0)),
            scalar("2", None, Some("Agro Leste"), json!(0)),
            scalar("3", None, Some("Mercado Sul"), json!(0)),
            scalar("4", None, Some("Mercado Sul"), json!(8)),
            scalar("5", None, Some("Casa Oeste"), json!(4)),
        ];
        let report = aggregate(records, &AggregateOptions::default());
        let labels: Vec<&str> = report.rollups.iter().map(|r| r.client_label.as_str()).collect();
        assert_eq!(labels, ["Agro Leste", "Mercado Sul", "Solar Norte", "Casa Oeste"]);
    }

    #[test]
    fn totals_reconcile_with_rollups() {
        let records = vec![
            scalar("1", Some("1"), Some("A"), json!("12,5")),
            scalar("2", Some("1"), Some("A"), json!("abc")),
            scalar("3", Some("2"), Some("B"), json!(-4)),
            scalar("4", None, None, Value::Null),
            payload("5", Some("3"), Some("C"), json!({})),
            payload("6", Some("3"), Some("C"), json!({"injetado_ponta": 9})),
        ];
        let report = aggregate(records, &AggregateOptions { report_no_data: true, ..Default::default() });
        let m = &report.metrics;

        let unit_sum: usize = report.rollups.iter().map(|r| r.total_units).sum();
        let problem_sum: usize = report.rollups.iter().map(|r| r.problem_unit_count).sum();
        assert_eq!(unit_sum, 6);
        assert_eq!(m.total_units, 6);
        assert_eq!(problem_sum, m.units_zeroed);
        assert_eq!(m.units_zeroed, 2);
        assert_eq!(m.units_no_data, Some(1));
        assert_eq!(m.units_ok, 3);
        assert_eq!(m.total_injected, 21.5);
        assert_eq!(m.total_clients, 4);
        for r in &report.rollups {
            assert_eq!(r.total_units, r.units.len());
            assert!(r.problem_unit_count <= r.total_units);
            assert_eq!(r.problem_rate, r.problem_unit_count as f64 / r.total_units as f64 * 100.0);
        }
    }

    #[test]
    fn payload_month_fills_missing_reference_month() {
        let mut rec = payload("9", Some("5"), Some("E"), json!("{\"injetado\": 3, \"mes_referente\": \"05/2025\"}"));
        let report = aggregate(vec![rec.clone()], &AggregateOptions::default());
        assert_eq!(report.rollups[0].units[0].reference_month.as_deref(), Some("05/2025"));

        rec.reference_month = Some("06/2025".into());
        let report = aggregate(vec![rec], &AggregateOptions::default());
        assert_eq!(report.rollups[0].units[0].reference_month.as_deref(), Some("06/2025"));
    }

    #[test]
    fn no_data_count_is_hidden_unless_requested() {
        let report = aggregate(vec![scalar("1", None, Some("A"), json!(1))], &AggregateOptions::default());
        assert_eq!(report.metrics.units_no_data, None);
        let body = serde_json::to_value(&report.metrics).unwrap();
        assert!(body.get("ucsSemDados").is_none());
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = aggregate(Vec::new(), &AggregateOptions::default());
        assert!(report.rollups.is_empty());
        assert_eq!(report.metrics.total_units, 0);
        assert_eq!(report.metrics.global_problem_rate, 0.0);
    }

    #[test]
    fn repeated_runs_serialize_identically() {
        let records = vec![
            scalar("b", Some("1"), Some("A"), json!("1,5")),
            scalar("a", Some("2"), Some("B"), json!(0)),
            payload("c", None, None, json!({"injetado_fora_ponta": "2"})),
        ];
        let opts = AggregateOptions { report_no_data: true, ..Default::default() };
        let first = serde_json::to_string(&super::super::MetricsResponse::from(aggregate(records.clone(), &opts))).unwrap();
        let second = serde_json::to_string(&super::super::MetricsResponse::from(aggregate(records, &opts))).unwrap();
        assert_eq!(first, second);
    }
}
