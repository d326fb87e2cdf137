//! Legacy period code resolution.

use std::sync::Arc;

use nomina_core::period::format_period;

use crate::error::MigrationError;
use crate::store::PersonnelStore;

/// Derives the 4-character period code for an organizational unit from
/// its most recent applied affectation.
#[derive(Clone)]
pub struct PeriodResolver {
    store: Arc<dyn PersonnelStore>,
}

impl PeriodResolver {
    pub fn new(store: Arc<dyn PersonnelStore>) -> Self {
        Self { store }
    }

    /// `Ok(None)` when the unit has no applied affectation yet.
    pub async fn resolve(&self, org0: &str, org1: &str) -> Result<Option<String>, MigrationError> {
        let Some(entry) = self.store.latest_applied_affectation(org0, org1).await? else {
            tracing::debug!(org0, org1, "No applied affectation for unit");
            return Ok(None);
        };
        let period = format_period(entry.pay_period, entry.year)?;
        tracing::debug!(org0, org1, period = %period, log_id = entry.id, "Resolved legacy period");
        Ok(Some(period))
    }

    /// Like [`resolve`](Self::resolve), but a missing period is an error.
    pub async fn require(&self, org0: &str, org1: &str) -> Result<String, MigrationError> {
        self.resolve(org0, org1)
            .await?
            .ok_or_else(|| MigrationError::PeriodNotFound {
                org0: org0.to_string(),
                org1: org1.to_string(),
            })
    }
}
