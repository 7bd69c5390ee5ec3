//! Stylist Server Entry Point

use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use stylist_config::{load_settings, Settings};
use stylist_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("STYLIST_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        },
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config);

    tracing::info!("Starting Stylist Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let mut state = AppState::new(config.clone(), env.clone())
        .context("Failed to build application state")?;

    if config.observability.metrics_enabled {
        if let Some(handle) = init_metrics() {
            state = state.with_metrics(handle);
            tracing::info!("Initialized Prometheus metrics at /metrics");
        }
    }

    match state.reindex().await {
        Ok(report) => tracing::info!(
            version = report.version,
            products = report.products,
            rejected = report.rejected,
            "Catalog loaded"
        ),
        Err(e) => tracing::warn!(
            path = %config.catalog.path,
            error = %e,
            "Failed to load catalog, starting with an empty index"
        ),
    }

    let cleanup_shutdown = state.sessions.start_cleanup_task();

    // Create router
    let app = create_router(state);

    // Bind address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup_shutdown.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("stylist={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
