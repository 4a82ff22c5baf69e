use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::metrics;
use crate::rate_limit;
use crate::AppState;

/// Full application router.
///
/// Only the run endpoints are rate limited; both paths share one quota per
/// client.
pub fn app(state: Arc<AppState>) -> Router {
    let run_routes = Router::new()
        .route("/api/exercises/run-tests", post(handlers::run_tests))
        .route("/api/test-execution/run", post(handlers::run_tests))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ));

    Router::new()
        .merge(run_routes)
        .route("/api/test-execution/languages", get(handlers::list_languages))
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(state)
}
