// src/metrics/payload.rs

use serde_json::{Map, Value};

use super::normalize::try_parse_number;
use super::UnitStatus;

const OFF_PEAK_KEYS: &[&str] = &[
    "injetado_fora_ponta",
    "injetado fora ponta",
    "injetado_fora_de_ponta",
    "injetado fora de ponta",
    "injeção_fora_ponta",
    "injecao_fora_ponta",
    "injetado",
];

const PEAK_KEYS: &[&str] = &[
    "injetado_ponta",
    "injetado ponta",
    "injeção_ponta",
    "injecao_ponta",
];

const MONTH_KEYS: &[&str] = &[
    "mes_referencia",
    "mês_referência",
    "mes_referente",
    "mês referente",
    "mes referencia",
    "referencia",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadReading {
    pub injected: Option<f64>,
    pub status: UnitStatus,
    pub reference_month: Option<String>,
}

impl PayloadReading {
    fn no_data() -> Self {
        Self { injected: None, status: UnitStatus::NoData, reference_month: None }
    }
}

/// Pulls the injected-energy reading out of an extraction payload. Accepts an
/// already-decoded object or a JSON string, optionally wrapped in a ``` fence.
pub fn extract_payload(payload: &Value) -> PayloadReading {
    let decoded;
    let object = match payload {
        Value::Object(map) => map,
        Value::String(text) => {
            decoded = match serde_json::from_str::<Value>(strip_fences(text)) {
                Ok(v) => v,
                Err(_) => return PayloadReading::no_data(),
            };
            match &decoded {
                Value::Object(map) => map,
                _ => return PayloadReading::no_data(),
            }
        }
        _ => return PayloadReading::no_data(),
    };

    let reference_month = lookup_month(object);
    let off_peak = lookup(object, OFF_PEAK_KEYS);
    let peak = lookup(object, PEAK_KEYS);

    let off_value = off_peak.and_then(try_parse_number);
    let peak_value = peak.and_then(try_parse_number);

    let (injected, status) = match (off_value, peak_value) {
        (Some(v), _) if v > 0.0 => (Some(v), UnitStatus::Ok),
        (_, Some(v)) if v > 0.0 => (Some(v), UnitStatus::Ok),
        _ if all_present_are_zero(&[off_peak, peak]) => (Some(0.0), UnitStatus::Zeroed),
        _ => (None, UnitStatus::NoData),
    };

    PayloadReading { injected, status, reference_month }
}

fn strip_fences(text: &str) -> &str {
    let mut body = text.trim();
    for opener in ["```json", "```JSON", "```"] {
        if let Some(rest) = body.strip_prefix(opener) {
            body = rest;
            break;
        }
    }
    body = body.trim();
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

// A reading counts as zero only when it is present and parses to exactly 0.
fn all_present_are_zero(readings: &[Option<&Value>]) -> bool {
    let present: Vec<&Value> = readings.iter().flatten().copied().collect();
    !present.is_empty() && present.iter().all(|v| try_parse_number(v) == Some(0.0))
}

fn lookup_month(object: &Map<String, Value>) -> Option<String> {
    match lookup(object, MONTH_KEYS)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
