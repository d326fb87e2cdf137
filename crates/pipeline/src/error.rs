use nomina_core::error::CoreError;
use nomina_core::types::DbId;
use nomina_legacy::LegacyError;

use crate::result::MigrationOutcome;

/// Why a migration step failed.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Movement {0} not found")]
    MovementNotFound(DbId),

    #[error("Movement type {0} not found")]
    MovementTypeNotFound(DbId),

    #[error("Unknown movement code '{0}'")]
    UnknownMovementCode(String),

    #[error("Affiliate {0} not found")]
    AffiliateNotFound(DbId),

    #[error("Affiliate {0} has no organizational assignment")]
    AssignmentNotFound(DbId),

    /// No applied affectation establishes a period for the unit yet.
    #[error("No applied affectation period for organizational unit {org0}/{org1}")]
    PeriodNotFound { org0: String, org1: String },

    /// A field is missing or out of range.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// "Create affiliate" returned no identity.
    #[error("Legacy store rejected affiliate {affiliate_id}: {}", .problems.join("; "))]
    IdentityRejected {
        affiliate_id: DbId,
        problems: Vec<String>,
    },

    #[error(transparent)]
    Legacy(#[from] LegacyError),

    #[error("Relational store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl MigrationError {
    /// Outcome reported in the migration result for this failure.
    pub fn outcome(&self) -> MigrationOutcome {
        match self {
            Self::Legacy(e) => match e {
                LegacyError::Unavailable | LegacyError::Connect(_) => MigrationOutcome::Connectivity,
                LegacyError::Timeout { .. } => MigrationOutcome::Timeout,
                LegacyError::Conflict { .. } => MigrationOutcome::Conflict,
                _ => MigrationOutcome::Fatal,
            },
            Self::IdentityRejected { .. } => MigrationOutcome::BusinessRejection,
            Self::Store(_) => MigrationOutcome::Fatal,
            _ => MigrationOutcome::ValidationFailure,
        }
    }

    /// Retries spent by a legacy call that ultimately failed.
    pub fn retries_consumed(&self) -> u32 {
        match self {
            Self::Legacy(LegacyError::Timeout { attempts, .. })
            | Self::Legacy(LegacyError::Conflict { attempts, .. }) => attempts.saturating_sub(1),
            _ => 0,
        }
    }

    /// Vendor code of the underlying legacy failure, if any.
    pub fn legacy_code(&self) -> Option<i64> {
        match self {
            Self::Legacy(e) => e.driver_code(),
            _ => None,
        }
    }
}

impl From<CoreError> for MigrationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => Self::Validation(msg),
        }
    }
}
