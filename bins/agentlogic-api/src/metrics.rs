// Prometheus metrics for the test runner service

use agentlogic_common::{RunResponse, TestStatus};
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref BATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "agentlogic_batches_total",
        "Test batches executed, by language and outcome",
        &["language", "outcome"]
    )
    .expect("register agentlogic_batches_total");

    pub static ref TEST_CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "agentlogic_test_cases_total",
        "Test cases executed, by language and status",
        &["language", "status"]
    )
    .expect("register agentlogic_test_cases_total");

    pub static ref REJECTED_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "agentlogic_rejected_requests_total",
        "Run requests rejected before execution",
        &["reason"]
    )
    .expect("register agentlogic_rejected_requests_total");

    pub static ref BATCH_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "agentlogic_batch_duration_seconds",
        "Wall-clock duration of a test batch",
        &["language"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("register agentlogic_batch_duration_seconds");
}

fn status_label(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "passed",
        TestStatus::Failed => "failed",
        TestStatus::TimeLimitExceeded => "timeout",
        TestStatus::RuntimeError => "runtime_error",
        TestStatus::ParseError => "parse_error",
    }
}

pub fn record_batch(language: &str, response: &RunResponse, elapsed_secs: f64) {
    let outcome = if response.summary.all_passed { "all_passed" } else { "has_failures" };
    BATCHES_TOTAL.with_label_values(&[language, outcome]).inc();
    BATCH_DURATION_SECONDS
        .with_label_values(&[language])
        .observe(elapsed_secs);
    for result in &response.results {
        TEST_CASES_TOTAL
            .with_label_values(&[language, status_label(result.status)])
            .inc();
    }
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain".to_string())],
            format!("Failed to encode metrics: {}", e).into_bytes(),
        );
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
}
