mod config;
mod handlers;
mod metrics;
mod rate_limit;
mod routes;

use agentlogic_runner::{LanguageConfigManager, TestRunner};
use anyhow::Context;
use rate_limit::FixedWindowLimiter;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

pub struct AppState {
    pub runner: TestRunner,
    pub limiter: FixedWindowLimiter,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::Settings::from_env()?;
    init_tracing(settings.json_logs);

    info!("AgentLogic test runner booting...");

    // Load language configurations
    let languages = LanguageConfigManager::load_default().map_err(|e| {
        error!("Failed to load language configurations: {:#}", e);
        e
    })?;
    info!("Enabled languages: {:?}", languages.list_languages());

    let state = Arc::new(AppState {
        runner: TestRunner::new(languages, settings.limits),
        limiter: FixedWindowLimiter::new(settings.rate_limit_max, settings.rate_limit_window),
    });

    let app = routes::app(state);

    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        rate_limit_max = settings.rate_limit_max,
        rate_limit_window_secs = settings.rate_limit_window.as_secs(),
        "HTTP server listening on {}",
        addr
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    warn!("Received shutdown signal, finishing in-flight requests...");
}
