// src/config.rs

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::metrics::sources::MetricsSource;
use crate::metrics::UnidentifiedClients;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub metrics_source: MetricsSource,
    pub unidentified_clients: UnidentifiedClients,
    pub draft_timeout: Duration,
}

impl AppConfig {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;
        let supabase_url = get("SUPABASE_URL")
            .context("SUPABASE_URL must be set")?
            .trim_end_matches('/')
            .to_string();
        let supabase_anon_key = get("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;

        let port = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT '{p}'"))?,
            None => 8080,
        };
        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(n) => n.parse().with_context(|| format!("invalid DB_MAX_CONNECTIONS '{n}'"))?,
            None => 10,
        };
        let metrics_source = match get("METRICS_SOURCE") {
            Some(s) => s.parse().map_err(anyhow::Error::msg)?,
            None => MetricsSource::default(),
        };
        let unidentified_clients = match get("UNIDENTIFIED_CLIENTS") {
            Some(s) => s.parse().map_err(anyhow::Error::msg)?,
            None => UnidentifiedClients::default(),
        };
        let draft_timeout_ms: u64 = match get("DRAFT_TIMEOUT_MS") {
            Some(ms) => ms.parse().with_context(|| format!("invalid DRAFT_TIMEOUT_MS '{ms}'"))?,
            None => 6000,
        };

        Ok(Self {
            database_url,
            db_max_connections,
            port,
            supabase_url,
            supabase_anon_key,
            metrics_source,
            unidentified_clients,
            draft_timeout: Duration::from_millis(draft_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/crm"),
        ("SUPABASE_URL", "https://example.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.supabase_url, "https://example.supabase.co");
        assert_eq!(cfg.metrics_source, MetricsSource::Payload);
        assert_eq!(cfg.unidentified_clients, UnidentifiedClients::Placeholder);
        assert_eq!(cfg.draft_timeout, Duration::from_secs(6));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "3000"),
            ("METRICS_SOURCE", "joined"),
            ("UNIDENTIFIED_CLIENTS", "skip"),
            ("DRAFT_TIMEOUT_MS", "1500"),
        ]);
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.metrics_source, MetricsSource::Joined);
        assert_eq!(cfg.unidentified_clients, UnidentifiedClients::Skip);
        assert_eq!(cfg.draft_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn policy_values_ignore_case() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("METRICS_SOURCE", "View"), ("UNIDENTIFIED_CLIENTS", " SKIP ")]);
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.metrics_source, MetricsSource::View);
        assert_eq!(cfg.unidentified_clients, UnidentifiedClients::Skip);
    }

    #[test]
    fn missing_database_url_fails() {
        let err = AppConfig::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn bad_values_fail() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("UNIDENTIFIED_CLIENTS", "drop"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("METRICS_SOURCE", "csv"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }
}
