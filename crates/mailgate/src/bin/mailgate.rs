//! Mail gateway binary.
//!
//! Standalone HTTP service that forwards emails to the configured provider.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mailgate::{server, Config, EmailSender, HttpTransport, RetryableExecutor};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real deployments use the environment.
    let dotenv = dotenvy::dotenv();

    init_tracing()?;

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    let provider = config
        .build_provider()
        .context("Failed to configure email provider")?;

    info!(
        provider = provider.name(),
        url = %provider.url(),
        retries = config.retry.retries,
        backoff_ms = u64::try_from(config.retry.backoff.as_millis()).unwrap_or(u64::MAX),
        "Email provider configured"
    );

    let transport =
        HttpTransport::new(config.http_timeout).context("Failed to create HTTP client")?;
    let executor = RetryableExecutor::new(Arc::new(transport), config.retry);
    let sender = EmailSender::new(provider, executor);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    server::run_server(
        listener,
        server::AppState::new(Arc::new(sender)),
        shutdown_signal(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("mailgate=info,tower_http=info"))?;

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
