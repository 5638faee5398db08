//! GenHub Server: image job orchestration.
//!
//! Main entry point that wires the crates together and starts the server.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use genhub_api::{AppState, build_router};
use genhub_core::config::{AppConfig, ExecutionMode};
use genhub_core::error::AppError;
use genhub_entity::job::{IMAGE_FUSION, IMAGE_GENERATION};
use genhub_worker::jobs::{FusionProcessor, GenerationProcessor, HttpUpstreamClient, UpstreamClient};
use genhub_worker::{EvictionScheduler, ProcessorRegistry, RetryPolicy};

#[tokio::main]
async fn main() -> ExitCode {
    let env = std::env::var("GENHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);
    tracing::info!("Loaded config (env: {})", env);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Register the built-in image processors against the configured upstream.
fn build_registry(config: &AppConfig) -> Result<ProcessorRegistry, AppError> {
    let client = HttpUpstreamClient::from_config(&config.upstream)
        .map_err(|e| AppError::configuration(format!("Upstream client init failed: {}", e)))?;
    let client: Arc<dyn UpstreamClient> = Arc::new(client);
    let retry = RetryPolicy::from_config(&config.upstream);

    let mut registry = ProcessorRegistry::new();
    registry.register(
        IMAGE_GENERATION,
        GenerationProcessor::new(Arc::clone(&client), retry),
    );
    registry.register(IMAGE_FUSION, FusionProcessor::new(client, retry));
    Ok(registry)
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting GenHub v{}", env!("CARGO_PKG_VERSION"));

    let mode = config.execution.resolve();
    tracing::info!(mode = %mode, "Execution mode resolved");

    let registry = build_registry(&config)?;
    tracing::info!(job_types = ?registry.registered_types(), "Processors registered");

    let state = AppState::new(config.clone(), mode, registry);

    // Inline mode never leaves anything in the store to sweep.
    let scheduler = match mode {
        ExecutionMode::Async => {
            let scheduler = EvictionScheduler::new(state.store.clone()).await?;
            scheduler
                .register_eviction(&config.jobs.eviction_cron, config.jobs.retention())
                .await?;
            scheduler.start().await?;
            Some(scheduler)
        }
        ExecutionMode::Sync => None,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("GenHub server listening on {}", addr);

    let runner = state.runner.clone();
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }

    drain_in_flight(&runner, Duration::from_secs(config.server.shutdown_grace_seconds)).await;

    tracing::info!("GenHub server shut down gracefully");
    Ok(())
}

/// Give running jobs up to `grace` to finish before the process exits.
async fn drain_in_flight(runner: &genhub_worker::JobRunner, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    while runner.in_flight() > 0 {
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(remaining = runner.in_flight(), "Abandoning in-flight jobs");
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
