//! Keygate - Main Entry Point
//! Background sync loop providing downloaded key files to the matching engine

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use config::{DaemonConfig, LogFormat};
use keygate_core::application::{shutdown_channel, DiagnosisKeyProvider, KeySyncJob};
use keygate_core::port::id_provider::UuidProvider;
use keygate_core::port::time_provider::SystemTimeProvider;
use keygate_core::port::TimeProvider;
use keygate_infra_system::{
    DailySubmissionQuota, DirectoryKeySource, FileVersionGuard, SpoolMatchingClient,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long an in-flight sync cycle may take to finish on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("keygate=info"))
        .context("Failed to create env filter")?;

    let fmt_layer = match format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(telemetry::otel_layer::<Registry>()?)
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env().context("Invalid configuration")?;

    // 2. Initialize logging
    init_logging(config.log_format)?;

    info!("Keygate v{} starting...", VERSION);
    info!(
        inbox = %config.inbox_dir.display(),
        spool = %config.spool_dir.display(),
        version_file = %config.engine_version_file.display(),
        sync_interval_secs = config.sync_interval.as_secs(),
        daily_quota = config.daily_quota,
        min_engine_version = %config.min_engine_version,
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.inbox_dir)
        .await
        .with_context(|| format!("Cannot create inbox {}", config.inbox_dir.display()))?;

    // 3. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);

    let version_guard = Arc::new(FileVersionGuard::new(&config.engine_version_file));
    let quota_ledger = Arc::new(DailySubmissionQuota::new(
        time_provider.clone(),
        config.daily_quota,
    ));
    let matching_client = Arc::new(SpoolMatchingClient::new(
        &config.spool_dir,
        id_provider,
        time_provider.clone(),
    ));
    if let Err(e) = matching_client.remove_stale_staging().await {
        tracing::warn!(error = %e, "Could not sweep engine spool");
    }

    let provider = Arc::new(
        DiagnosisKeyProvider::new(version_guard, quota_ledger, matching_client)
            .with_required_version(config.min_engine_version),
    );
    let source = Arc::new(DirectoryKeySource::new(
        &config.inbox_dir,
        &config.key_file_extension,
    ));

    // 4. Start sync job
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let sync_job = KeySyncJob::new(source, provider, config.sync_interval);

    let sync_handle = tokio::spawn(async move {
        sync_job.run(shutdown_rx).await;
    });

    info!("System ready. Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 6. Graceful shutdown
    shutdown_tx.shutdown();
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, sync_handle).await;

    info!("Shutdown complete.");

    Ok(())
}
