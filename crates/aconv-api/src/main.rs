//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use aconv_media::{check_ffmpeg, FfmpegConverter};
use aconv_queue::{JobQueue, JobRegistry, QueueConfig, RetentionSweeper};
use aconv_storage::{S3Config, S3Uploader};
use aconv_worker::{
    MediaToMp3Handler, ResultReporter, WebhookClient, WebhookConfig, WorkerConfig, WorkerPool,
};
use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aconv_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    init_tracing()?;

    info!("Starting aconv-api");

    let config = ApiConfig::from_env();
    let queue_config = QueueConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    let webhook_config = WebhookConfig::from_env();
    info!(
        "API config: host={}, port={}, queue_capacity={}, workers={}",
        config.host, config.port, queue_config.capacity, worker_config.concurrency
    );

    if config.api_key.is_none() {
        warn!("API_KEY is not set, requests are accepted without authentication");
    }
    match check_ffmpeg() {
        Ok(path) => info!("Using FFmpeg at {}", path.display()),
        Err(e) => warn!("{}; conversions will fail until it is installed", e),
    }

    tokio::fs::create_dir_all(&worker_config.work_dir)
        .await
        .with_context(|| format!("Failed to create work dir {}", worker_config.work_dir))?;

    // Job core
    let registry = Arc::new(JobRegistry::new());
    let queue = Arc::new(JobQueue::new(Arc::clone(&registry), queue_config.capacity));

    let s3_config = S3Config::from_env().context("Invalid S3 configuration")?;
    let converter = FfmpegConverter::new(
        worker_config.work_dir.clone(),
        worker_config.convert_timeout.as_secs(),
    );
    let handler = Arc::new(MediaToMp3Handler::new(
        Arc::new(converter),
        Arc::new(S3Uploader::new(&s3_config)),
    ));

    let webhook = WebhookClient::new(&webhook_config).context("Failed to build webhook client")?;
    let reporter = Arc::new(ResultReporter::new(Arc::clone(&registry), webhook));

    let pool = Arc::new(WorkerPool::new(
        worker_config,
        Arc::clone(&queue),
        handler.clone(),
        Arc::clone(&reporter),
    ));
    let pool_task = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.run().await })
    };

    let (sweeper_tx, sweeper_rx) = watch::channel(false);
    let sweeper_task = tokio::spawn(RetentionSweeper::new(Arc::clone(&registry), &queue_config).run(sweeper_rx));

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("Failed to install Prometheus recorder")?)
    } else {
        None
    };

    let state = AppState::new(
        config.clone(),
        Arc::clone(&queue),
        handler,
        reporter,
        pool.concurrency(),
    );
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // Refuse new work, then let in-flight jobs finish
    queue.close().await;
    pool.shutdown();
    let _ = sweeper_tx.send(true);

    if let Err(e) = pool_task.await {
        error!("Worker pool task failed: {}", e);
    }
    if let Err(e) = sweeper_task.await {
        error!("Retention sweeper task failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("aconv=info".parse()?);

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
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
