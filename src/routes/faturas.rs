// src/routes/faturas.rs

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::ReportViewer;
use crate::error::AppResult;
use crate::metrics::sources::load_units;
use crate::metrics::{aggregate, AggregateOptions, MetricsResponse, Reconciliation};
use crate::AppState;

pub(crate) fn no_store(mut res: Response) -> Response {
    let headers = res.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    res
}

// GET /api/faturas/metrics
pub async fn get_metrics(
    viewer: ReportViewer,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let source = state.config.metrics_source;
    let loaded = load_units(&state.pool, source).await.map_err(|e| {
        tracing::error!(error = %e, ?source, "failed to load billing units");
        e
    })?;

    let options = AggregateOptions {
        unidentified: state.config.unidentified_clients,
        report_no_data: source.supports_no_data(),
    };
    let report = aggregate(loaded.records, &options);

    let mut body = MetricsResponse::from(report);
    if let Some(total_from_source) = loaded.total_from_source {
        let reconciliation = Reconciliation::new(body.metrics.total_injected, total_from_source);
        if !reconciliation.totals_match {
            tracing::warn!(
                aggregated = body.metrics.total_injected,
                from_source = total_from_source,
                diff = reconciliation.totals_diff,
                "injected totals do not reconcile"
            );
        }
        body.reconciliation = Some(reconciliation);
    }

    tracing::info!(
        user_id = %viewer.user.id,
        role = ?viewer.role,
        clients = body.metrics.total_clients,
        units = body.total,
        "billing metrics served"
    );
    Ok(no_store(Json(body).into_response()))
}
