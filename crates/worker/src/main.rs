use std::sync::Arc;

use anyhow::Context;
use nomina_worker::config::{BridgeConfig, SyncMode};
use nomina_worker::{build_orchestrator, SyncWorker, UnlinkedConnector};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nomina_worker=debug,nomina_pipeline=debug,nomina_legacy=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = BridgeConfig::from_env()?;
    tracing::info!(
        mode = config.mode.as_str(),
        charset = %config.charset,
        "Loaded bridge configuration",
    );
    if config.mode == SyncMode::Live {
        anyhow::bail!("SYNC_MODE=live needs a legacy driver; this binary only supports dry_run");
    }

    // --- Database ---
    let pool = nomina_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    nomina_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    nomina_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Worker ---
    let orchestrator = build_orchestrator(&config, pool.clone(), Arc::new(UnlinkedConnector));
    let worker = SyncWorker::new(
        pool,
        Arc::new(orchestrator),
        config.mode,
        config.poll_interval,
        config.batch_size,
    );

    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let handle = tokio::spawn(async move { worker.run(worker_cancel).await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl-C handler")?;
    tracing::info!("Received Ctrl-C, shutting down");
    cancel.cancel();
    handle.await.context("Sync worker task panicked")?;

    tracing::info!("Shutdown complete");
    Ok(())
}
