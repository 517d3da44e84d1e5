use anyhow::Result;
use relay_core::{config::AppConfig, limiter::ServerRateLimiter, proxy::ProxyEngine};
use server::{build_app, AppState};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,relay_core={level},server={level}",
            level = config.logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        // "pretty" and any other format default to pretty logging
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(
        AppConfig::load().map_err(|e| anyhow::anyhow!("configuration failed to load: {e}"))?,
    );
    init_logging(&config);
    info!("Starting Sui RPC relay");

    let engine = Arc::new(
        ProxyEngine::new(Arc::clone(&config))
            .map_err(|e| anyhow::anyhow!("engine initialization failed: {e}"))?,
    );
    engine.start_background_tasks();

    let limiter = Arc::new(ServerRateLimiter::new(
        config.rate_limit.max_per_window,
        Duration::from_secs(config.rate_limit.window_seconds),
    ));
    limiter.start_reset_task();

    info!(
        primary = %config.upstream.primary_url,
        fallback = %config.upstream.fallback_url,
        birdeye_enabled = config.birdeye.api_key.is_some(),
        "upstream endpoints configured"
    );

    let app = build_app(AppState { engine, limiter }, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.bind_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;
    info!(address = %addr, "relay listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error occurred");
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
