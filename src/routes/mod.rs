use serde::Deserialize;

pub mod clientes;
pub mod contatos;
pub mod faturas;
pub mod health;
pub mod preferences;
pub mod relatorios;
pub mod tecnica;
pub mod vinculos;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// Query string shared by the CRM list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQ {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQ {
    /// ILIKE pattern for the free-text search, if any.
    pub fn pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"))
    }
}

pub fn page(q: &ListQ) -> (i64, i64) {
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = q.offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_pattern_ignores_blank_queries() {
        assert_eq!(ListQ::default().pattern(), None);
        let q = ListQ { q: Some("  ".into()), ..Default::default() };
        assert_eq!(q.pattern(), None);
        let q = ListQ { q: Some(" solar ".into()), ..Default::default() };
        assert_eq!(q.pattern().as_deref(), Some("%solar%"));
    }

    #[test]
    fn paging_is_clamped() {
        assert_eq!(page(&ListQ::default()), (50, 0));
        let q = ListQ { limit: Some(10_000), offset: Some(-5), ..Default::default() };
        assert_eq!(page(&q), (500, 0));
        let q = ListQ { limit: Some(0), offset: Some(20), ..Default::default() };
        assert_eq!(page(&q), (1, 20));
    }
}
