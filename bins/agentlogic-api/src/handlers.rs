// HTTP route handlers for the AgentLogic test runner

use agentlogic_common::{ErrorResponse, RunPayload};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::metrics;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub name: String,
    pub backend: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub success: bool,
    pub languages: Vec<LanguageInfo>,
}

fn bad_request(message: String) -> Response {
    metrics::REJECTED_REQUESTS_TOTAL
        .with_label_values(&["validation"])
        .inc();
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message.clone(), Some(message))),
    )
        .into_response()
}

/// POST /api/test-execution/run - Run a submission against its test cases
///
/// 200 whenever the batch completed, whatever the individual outcomes.
pub async fn run_tests(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed run request");
            return bad_request(format!("Invalid request body: {}", rejection.body_text()));
        }
    };

    let request = match state.runner.validate(payload) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Run request rejected");
            return bad_request(e.to_string());
        }
    };

    let start = Instant::now();
    match state.runner.run_tests(&request).await {
        Ok(response) => {
            let elapsed = start.elapsed();
            metrics::record_batch(request.language.as_str(), &response, elapsed.as_secs_f64());
            info!(
                language = %request.language,
                total = response.summary.total,
                passed = response.summary.passed,
                execution_ms = elapsed.as_millis() as u64,
                "Test run completed"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!(language = %request.language, error = %e, "Test run failed");
            metrics::BATCHES_TOTAL
                .with_label_values(&[request.language.as_str(), "error"])
                .inc();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Error running tests", Some(format!("{:#}", e)))),
            )
                .into_response()
        }
    }
}

/// GET /api/test-execution/languages - Enabled languages and their backends
pub async fn list_languages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let manager = state.runner.languages();
    let languages = manager
        .list_languages()
        .into_iter()
        .filter_map(|language| {
            manager.get_config(&language).ok().map(|config| LanguageInfo {
                name: language.to_string(),
                backend: language.backend().to_string(),
                timeout_ms: config.timeout_ms,
            })
        })
        .collect();

    Json(LanguagesResponse {
        success: true,
        languages,
    })
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
