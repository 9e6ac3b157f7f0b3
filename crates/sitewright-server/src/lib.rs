//! Sitewright Server Library
//!
//! Provides the HTTP front door: authenticates submitted tasks, hands them to
//! the pipeline in the background and answers immediately.

pub mod routes;
pub mod state;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sitewright_core::security::redact;
use sitewright_core::{AppConfig, LogFormat, LoggingConfig};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Once;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use routes::ApiError;
pub use state::AppState;

static TRACING_INIT: Once = Once::new();

/// Default filter when `RUST_LOG` is unset
fn default_filter(level: &str) -> String {
    format!(
        "sitewright={level},sitewright_core={level},sitewright_server={level},tower_http=info"
    )
}

/// Initialize tracing subscriber (only once)
pub fn init_tracing(logging: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter(&logging.level)),
        );
        let registry = tracing_subscriber::registry().with(filter);

        let result = match logging.format {
            LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
            LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        };
        if let Err(err) = result {
            eprintln!("tracing already initialised: {}", err);
        }
    });
}

/// Flatten the settings worth echoing at startup
fn config_summary(config: &AppConfig) -> BTreeMap<String, String> {
    let mut settings = BTreeMap::new();
    settings.insert("bind_addr".to_string(), config.bind_addr());
    settings.insert("secret".to_string(), config.service.secret.clone());
    settings.insert("github_owner".to_string(), config.github.owner.clone());
    settings.insert("github_token".to_string(), config.github.token.clone());
    for (name, provider) in [("primary", &config.llm.primary), ("secondary", &config.llm.secondary)] {
        settings.insert(format!("{}_model", name), provider.model.clone());
        settings.insert(format!("{}_base_url", name), provider.base_url.clone());
        settings.insert(format!("{}_api_key", name), provider.api_key.clone());
    }
    settings.insert("task_timeout_secs".to_string(), config.task.timeout_secs.to_string());
    settings
}

/// Turn a handler panic into a 500 with the usual error body
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(panic = %message, "handler panicked");
    ApiError::Internal.into_response()
}

/// Build the Axum router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/health/providers", get(routes::provider_health))
        .route("/api-endpoint", post(routes::submit_task))
        // Middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
        .with_state(state)
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

/// Run the Sitewright server until a shutdown signal arrives
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    // Initialize tracing (if not already done)
    init_tracing(&config.logging);

    tracing::info!(version = sitewright_core::version(), "Starting Sitewright Server...");
    tracing::debug!(settings = ?redact(&config_summary(&config)), "effective configuration");

    let state = AppState::from_config(&config)?;
    tracing::info!(
        providers = ?state.pipeline.providers().ids(),
        owner = %config.github.owner,
        "pipeline ready"
    );

    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
