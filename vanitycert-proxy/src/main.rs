//! VanityCert proxy server.
//!
//! Serves the widget proxy, the webhook receiver and a health check. Refuses
//! to start without `VANITYCERT_API_KEY_ID` and `VANITYCERT_API_KEY`.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vanitycert_proxy::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("proxy_server_starting");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config_invalid");
            return Err(e).context("Failed to load configuration");
        }
    };

    info!(
        port = config.port,
        api_url = %config.api_url,
        api_key_id = %config.api_key_id,
        webhook_verification = config.webhook_secret.is_some(),
        rate_limit = ?config.rate_limit,
        "config_loaded"
    );

    let port = config.port;
    let state = AppState::new(config)?;
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(
        address = %addr,
        proxy_endpoint = %format!("http://localhost:{}/api/vanitycert-proxy", port),
        "proxy_server_listening"
    );

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("proxy_server_shutdown_complete");

    Ok(())
}

/// Resolve on SIGINT or SIGTERM so in-flight proxy calls can drain.
///
/// A signal whose handler cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                warn!(error = %e, signal = "SIGINT", "signal_handler_unavailable");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                warn!(error = %e, signal = "SIGTERM", "signal_handler_unavailable");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };

    info!(signal = received, "proxy_server_shutting_down");
}
