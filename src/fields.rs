// src/fields.rs
//
// Write-side cleanup for CRM form fields. Inserts store blanks as NULL.
// Patches keep three states: absent (leave column alone), blank (clear the
// column, via NULLIF in SQL) and a value.

use crate::metrics::normalize::digits_only;

pub fn text(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn digits(v: Option<String>) -> Option<String> {
    digits_only(v.as_deref())
}

pub fn email(v: Option<String>) -> Option<String> {
    text(v).map(|s| s.to_lowercase())
}

pub fn patch_text(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

pub fn patch_digits(v: Option<String>) -> Option<String> {
    v.map(|s| s.chars().filter(|c| c.is_ascii_digit()).collect())
}

pub fn patch_email(v: Option<String>) -> Option<String> {
    patch_text(v).map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_turn_blanks_into_null() {
        assert_eq!(text(Some("  ".into())), None);
        assert_eq!(text(Some(" Rua A ".into())).as_deref(), Some("Rua A"));
        assert_eq!(digits(Some("(11) 98888-7777".into())).as_deref(), Some("11988887777"));
        assert_eq!(digits(Some("--".into())), None);
        assert_eq!(email(Some(" Fulano@Empresa.COM ".into())).as_deref(), Some("fulano@empresa.com"));
    }

    #[test]
    fn patches_keep_absent_and_blank_apart() {
        assert_eq!(patch_text(None), None);
        assert_eq!(patch_text(Some("   ".into())).as_deref(), Some(""));
        assert_eq!(patch_digits(Some("01310-100".into())).as_deref(), Some("01310100"));
        assert_eq!(patch_digits(Some("n/a".into())).as_deref(), Some(""));
        assert_eq!(patch_email(Some("A@B.C".into())).as_deref(), Some("a@b.c"));
    }
}
