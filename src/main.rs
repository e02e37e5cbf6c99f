//! PDF Layout Server
//!
//! Layout-aware text span extraction for uploaded PDF documents.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_layout_server::config::Config;
use pdf_layout_server::decoder::MuPdfDecoder;
use pdf_layout_server::limits::{whole_megabytes, ResourceLimits};
use pdf_layout_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pdf_layout_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let limits = ResourceLimits::DEFAULT;
    tracing::info!("Starting PDF Layout Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Limits: {}MB per upload, {} pages per document",
        whole_megabytes(limits.max_file_size_bytes),
        limits.max_page_count
    );
    match &config.upload.temp_dir {
        Some(dir) => tracing::info!("Upload artifacts in {}", dir.display()),
        None => tracing::info!("Upload artifacts in system temp dir"),
    }

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid SERVER_HOST: {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    let app_state = AppState::with_limits(config, Arc::new(MuPdfDecoder), limits);
    let app = pdf_layout_server::router(app_state);

    tracing::info!("PDF Layout Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
