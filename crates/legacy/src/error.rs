use crate::driver::DriverError;

/// Errors surfaced by the legacy gateway and the procedure invoker.
#[derive(Debug, thiserror::Error)]
pub enum LegacyError {
    /// No live legacy connection at submission or dispatch time.
    #[error("Legacy database not available")]
    Unavailable,

    /// Establishing the connection (or its liveness probe) failed.
    #[error("Legacy connection failed: {0}")]
    Connect(DriverError),

    /// The call ceiling was hit on every permitted attempt.
    #[error("Procedure {procedure} timed out after {attempts} attempt(s)")]
    Timeout { procedure: String, attempts: u32 },

    /// Write conflicts persisted through every permitted attempt.
    #[error("Procedure {procedure} hit a write conflict after {attempts} attempt(s): {source}")]
    Conflict {
        procedure: String,
        attempts: u32,
        source: DriverError,
    },

    /// A non-retryable driver failure.
    #[error("Legacy driver error: {0}")]
    Driver(DriverError),

    /// The procedure returned without an expected output parameter.
    #[error("Procedure {procedure} returned no {column} output")]
    MissingOutput { procedure: String, column: String },

    /// The queued operation ended without producing a result.
    #[error("Legacy operation aborted before completion")]
    Aborted,
}

impl LegacyError {
    /// Short label for the failure category, used in logs and results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable | Self::Connect(_) => "connectivity",
            Self::Timeout { .. } => "timeout",
            Self::Conflict { .. } => "conflict",
            Self::Driver(_) | Self::MissingOutput { .. } | Self::Aborted => "fatal",
        }
    }

    /// Vendor error code carried by the underlying driver failure, if any.
    pub fn driver_code(&self) -> Option<i64> {
        match self {
            Self::Connect(e) | Self::Driver(e) | Self::Conflict { source: e, .. } => e.code,
            _ => None,
        }
    }
}
