//! payx-processor entry point.
//!
//! Thin by intent: tracing init, settings, pool + provider client wiring,
//! then the worker loop until SIGINT. The loop logic lives in the library
//! so tests can drive it iteration by iteration.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use payx_config::ProcessorSettings;
use payx_provider::{HttpProviderClient, ProviderDriver};
use payx_resilience::{CircuitBreakerConfig, RetryPolicy};
use payx_worker::{OutboxWorker, WorkerSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let settings = ProcessorSettings::from_env().context("invalid processor settings")?;
    info!(service = %settings.service_name, "starting");

    let pool = payx_db::connect(&settings.database_url).await?;

    let client = HttpProviderClient::new(&settings.provider_base_url, settings.provider_timeout)?;
    let driver = Arc::new(ProviderDriver::new(
        client,
        settings.bulkhead_limit_per_provider,
        CircuitBreakerConfig {
            failure_threshold: settings.breaker_failure_threshold,
            recovery_timeout: settings.breaker_recovery_timeout,
        },
        RetryPolicy::default(),
    ));

    let worker = OutboxWorker::new(
        pool,
        driver,
        WorkerSettings {
            poll_interval: settings.poll_interval,
            batch_size: settings.batch_size,
            max_event_attempts: settings.max_event_attempts,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = tokio::spawn(async move { worker.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    worker_task.await.context("worker task panicked")?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
