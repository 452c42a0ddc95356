// src/metrics/normalize.rs

use serde_json::Value;

/// Reads a number that may arrive as a JSON number or as a locale-formatted
/// string ("1.234,56", "10,5", " 42 kWh"). Anything unusable becomes `0`.
pub fn parse_number(value: &Value) -> f64 {
    try_parse_number(value).unwrap_or(0.0)
}

/// Same rules as [`parse_number`], but reports `None` instead of falling back.
pub fn try_parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_text_number(s),
        _ => None,
    }
}

pub fn parse_text_number(raw: &str) -> Option<f64> {
    let kept: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let canonical = match (kept.contains(','), kept.contains('.')) {
        // "1.234,56": dot groups thousands, comma marks decimals
        (true, true) => kept.replace('.', "").replace(',', "."),
        (true, false) => kept.replace(',', "."),
        _ => kept,
    };

    leading_number(&canonical).filter(|v| v.is_finite())
}

/// Longest `-?digits(.digits)?` prefix, so trailing text such as
/// "100-03-2025" still reads as `100`.
fn leading_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let start = usize::from(bytes.first() == Some(&b'-'));
    let mut end = digits_from(start);
    let mut has_digits = end > start;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 {
            end = frac_end;
            has_digits = true;
        }
    }

    if !has_digits {
        return None;
    }
    s[..end].parse().ok()
}

/// Keeps only ASCII digits; `None` when nothing is left.
pub fn digits_only(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn brazilian_thousands_and_decimal() {
        assert_eq!(parse_number(&json!("1.234,56")), 1234.56);
        assert_eq!(parse_number(&json!("10,5")), 10.5);
    }

    #[test]
    fn plain_numbers_pass_through() {
        assert_eq!(parse_number(&json!(42)), 42.0);
        assert_eq!(parse_number(&json!(-3.5)), -3.5);
        assert_eq!(parse_number(&json!("7.25")), 7.25);
    }

    #[test]
    fn garbage_becomes_zero() {
        assert_eq!(parse_number(&json!("abc")), 0.0);
        assert_eq!(parse_number(&Value::Null), 0.0);
        assert_eq!(parse_number(&json!(true)), 0.0);
        assert_eq!(parse_number(&json!({"injetado": 1})), 0.0);
        assert_eq!(try_parse_number(&json!("")), None);
    }

    #[test]
    fn units_and_spaces_are_stripped() {
        assert_eq!(parse_number(&json!("  150,00 kWh ")), 150.0);
        assert_eq!(parse_number(&json!("R$ 2.500,10")), 2500.1);
    }

    #[test]
    fn trailing_text_after_the_reading_is_ignored() {
        assert_eq!(parse_number(&json!("100 kWh - ref 03-2025")), 100.0);
        assert_eq!(parse_number(&json!("-12.5-abc")), -12.5);
        assert_eq!(parse_number(&json!(".5")), 0.5);
        assert_eq!(try_parse_number(&json!("- kWh")), None);
        assert_eq!(try_parse_number(&json!("-.")), None);
    }

    #[test]
    fn digits_only_drops_masks() {
        assert_eq!(
            digits_only(Some("12.345.678/0001-90")).as_deref(),
            Some("12345678000190")
        );
        assert_eq!(digits_only(Some(" - ")), None);
        assert_eq!(digits_only(None), None);
    }
}
