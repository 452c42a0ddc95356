// src/drafts.rs
//
// "Save draft" runs when the user navigates away from a dirty form. The save
// gets a fixed time budget and always reports back, so the caller can decide
// whether to leave the page.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftOutcome {
    pub saved: bool,
    #[serde(rename = "timedOut")]
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn save_with_deadline<F, T, E>(save: F, budget: Duration) -> DraftOutcome
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(budget, save).await {
        Ok(Ok(_)) => DraftOutcome { saved: true, timed_out: false, error: None },
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "draft save failed");
            DraftOutcome { saved: false, timed_out: false, error: Some(e.to_string()) }
        }
        Err(_) => {
            tracing::warn!(budget_ms = budget.as_millis() as u64, "draft save timed out");
            DraftOutcome {
                saved: false,
                timed_out: true,
                error: Some(format!("tempo limite de {} ms excedido", budget.as_millis())),
            }
        }
    }
}
