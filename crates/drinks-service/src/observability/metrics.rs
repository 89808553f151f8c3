//! Metrics definitions for the drinks service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `drinks_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: the routed paths, with `/drinks/{id}` parameterized
//! - `status`: success, error, timeout
//! - `outcome`/`stage`/`code`: bounded by the auth error taxonomy
//! - `operation`: bounded by repository methods

use crate::auth::AuthStage;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Histogram buckets for request and query latencies.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
];

/// Install the global Prometheus recorder.
///
/// Must be called once per process, before any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `drinks_http_requests_total`, `drinks_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 404, 405 and JSON rejections.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("drinks_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("drinks_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/drinks" => "/drinks",
        "/drinks-detail" => "/drinks-detail",
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => match path.strip_prefix("/drinks/") {
            Some(id) if !id.is_empty() && !id.contains('/') => "/drinks/{id}",
            _ => "/other",
        },
    }
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record one authorization gate decision.
///
/// Metric: `drinks_auth_decisions_total`
/// Labels: `outcome` (allowed, denied), `stage` (last stage reached),
/// `code` (error code, or "ok")
pub fn record_auth_decision(outcome: &'static str, stage: AuthStage, code: &'static str) {
    counter!("drinks_auth_decisions_total",
        "outcome" => outcome,
        "stage" => stage.as_str(),
        "code" => code
    )
    .increment(1);
}

/// Record a JWKS refresh attempt.
///
/// Metric: `drinks_jwks_refresh_total`, `drinks_jwks_refresh_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_refresh(status: &str, duration: Duration) {
    histogram!("drinks_jwks_refresh_duration_seconds").record(duration.as_secs_f64());

    counter!("drinks_jwks_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `drinks_db_query_duration_seconds`, `drinks_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("drinks_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("drinks_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
