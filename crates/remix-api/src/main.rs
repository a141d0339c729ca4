//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use remix_api::{create_router, metrics, ApiConfig, AppState};
use remix_media::check_ffmpeg;
use remix_pipeline::{PipelineConfig, RetentionSweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing()?;

    // rustls 0.23+ needs an explicit crypto provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting remix-api");

    let config = ApiConfig::from_env();
    let pipeline = PipelineConfig::from_env();
    info!(
        "API config: host={}, port={}, environment={}",
        config.host, config.port, config.environment
    );
    if config.is_production() && config.allows_any_origin() {
        warn!("CORS allows any origin in production; set CORS_ORIGINS to restrict it");
    }
    info!(
        "Pipeline config: staging={}, outputs={}, retention={:?}",
        pipeline.staging_dir.display(),
        pipeline.output_dir.display(),
        pipeline.retention
    );

    pipeline
        .ensure_dirs()
        .await
        .context("failed to create working directories")?;

    match check_ffmpeg() {
        Ok(path) => info!("Using FFmpeg at {}", path.display()),
        Err(e) => warn!("{}; remix requests will fail until it is installed", e),
    }

    let state = AppState::new(config.clone(), pipeline.clone())
        .context("failed to create application state")?;

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(RetentionSweeper::from_config(&pipeline).run(shutdown.clone()));

    let orchestrator = state.orchestrator.clone();
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!("Retention sweeper task failed: {}", e);
    }

    info!(
        "Draining {} pending staging cleanups",
        orchestrator.cleanup().pending()
    );
    orchestrator.cleanup().shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Colored text for development, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("remix=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("Received shutdown signal");
}
