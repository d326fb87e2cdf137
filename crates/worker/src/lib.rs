//! Background synchronization of pending movements into the legacy store.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nomina_core::encoding::EncodingCorrector;
use nomina_db::repositories::MovementRepo;
use nomina_db::DbPool;
use nomina_legacy::{DriverError, LegacyConnection, LegacyConnector, LegacyGateway, ProcedureInvoker};
use nomina_pipeline::{MigrationOrchestrator, PersonnelStore, PgPersonnelStore};
use tokio_util::sync::CancellationToken;

use crate::config::{BridgeConfig, SyncMode};

/// Connector used when no legacy driver is linked into the build. Every
/// connection attempt fails, so only dry-run previews can succeed.
pub struct UnlinkedConnector;

#[async_trait]
impl LegacyConnector for UnlinkedConnector {
    async fn connect(&self) -> Result<Arc<dyn LegacyConnection>, DriverError> {
        Err(DriverError::connection("No legacy driver is linked into this build"))
    }
}

/// Wire the gateway, invoker and orchestrator from configuration.
pub fn build_orchestrator(
    config: &BridgeConfig,
    pool: DbPool,
    connector: Arc<dyn LegacyConnector>,
) -> MigrationOrchestrator {
    let gateway = LegacyGateway::new(connector, EncodingCorrector::new(config.charset));
    let invoker = ProcedureInvoker::new(
        Arc::new(gateway),
        config.retry.clone(),
        config.procedures.clone(),
    );
    let store: Arc<dyn PersonnelStore> = Arc::new(PgPersonnelStore::new(pool));
    MigrationOrchestrator::new(store, invoker, config.site.clone())
}

/// Counts for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub pending: usize,
    pub applied: usize,
    pub failed: usize,
    pub previewed: usize,
}

/// Polls for movements not yet mirrored and pushes them through the
/// orchestrator one at a time.
pub struct SyncWorker {
    pool: DbPool,
    orchestrator: Arc<MigrationOrchestrator>,
    mode: SyncMode,
    poll_interval: Duration,
    batch_size: i64,
}

impl SyncWorker {
    pub fn new(
        pool: DbPool,
        orchestrator: Arc<MigrationOrchestrator>,
        mode: SyncMode,
        poll_interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            pool,
            orchestrator,
            mode,
            poll_interval,
            batch_size,
        }
    }

    /// Run the polling loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            mode = self.mode.as_str(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            "Sync worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Sync worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(summary) if summary.pending > 0 => {
                            tracing::info!(
                                pending = summary.pending,
                                applied = summary.applied,
                                failed = summary.failed,
                                previewed = summary.previewed,
                                "Sync cycle complete",
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Sync cycle failed"),
                    }
                }
            }
        }

        self.orchestrator.invoker().gateway().disconnect().await;
    }

    /// One cycle: fetch a batch of pending movements and process each.
    pub async fn run_once(&self) -> Result<BatchSummary, sqlx::Error> {
        let pending = MovementRepo::list_pending(&self.pool, self.batch_size).await?;
        let mut summary = BatchSummary {
            pending: pending.len(),
            ..Default::default()
        };

        for movement in pending {
            match self.mode {
                SyncMode::Live => {
                    let result = self.orchestrator.migrate_movement(movement.id).await;
                    if result.success {
                        MovementRepo::record_sync_success(&self.pool, movement.id).await?;
                        summary.applied += 1;
                    } else {
                        let detail = result
                            .context
                            .as_ref()
                            .map(|c| format!("{} at {}: {}", result.outcome, c.failed_step, c.detail))
                            .unwrap_or_else(|| result.outcome.to_string());
                        MovementRepo::record_sync_failure(&self.pool, movement.id, &detail).await?;
                        summary.failed += 1;
                    }
                }
                SyncMode::DryRun => match self.orchestrator.preview_movement(movement.id).await {
                    Ok(preview) => {
                        tracing::info!(
                            movement_id = movement.id,
                            interno = ?preview.interno,
                            statement = ?preview.statement,
                            "Dry-run preview",
                        );
                        summary.previewed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(movement_id = movement.id, error = %e, "Dry-run preview failed");
                        summary.failed += 1;
                    }
                },
            }
        }

        Ok(summary)
    }
}
