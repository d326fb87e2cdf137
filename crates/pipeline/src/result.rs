//! Outcome records returned by the orchestrator.

use nomina_core::types::{DbId, Interno};
use serde::Serialize;
use uuid::Uuid;

use crate::mapper::LegacyMovementPayload;

/// How a migration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Legacy code 0.
    Applied,
    /// The legacy store already held the target state.
    AlreadyActive,
    /// Missing or out-of-range data; no edit was attempted.
    ValidationFailure,
    /// The legacy store refused the movement or the identity.
    BusinessRejection,
    Connectivity,
    Timeout,
    Conflict,
    Fatal,
}

impl MigrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyActive => "already_active",
            Self::ValidationFailure => "validation_failure",
            Self::BusinessRejection => "business_rejection",
            Self::Connectivity => "connectivity",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::Fatal => "fatal",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied | Self::AlreadyActive)
    }
}

impl std::fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Migration steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    ResolveMovementCode,
    ResolveAssignment,
    ValidatePayload,
    ResolvePeriod,
    ResolveIdentity,
    InvokeEdit,
    InterpretResult,
}

impl MigrationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveMovementCode => "resolve_movement_code",
            Self::ResolveAssignment => "resolve_assignment",
            Self::ValidatePayload => "validate_payload",
            Self::ResolvePeriod => "resolve_period",
            Self::ResolveIdentity => "resolve_identity",
            Self::InvokeEdit => "invoke_edit",
            Self::InterpretResult => "interpret_result",
        }
    }
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about a migration when it failed, enough to replay
/// the legacy call by hand.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationContext {
    pub movement_id: DbId,
    pub affiliate_id: Option<DbId>,
    pub interno: Option<Interno>,
    pub org_codes: Vec<String>,
    pub period: Option<String>,
    pub payload: Option<LegacyMovementPayload>,
    /// Literal `EXECUTE PROCEDURE` statement for the edit call.
    pub statement: Option<String>,
    pub failed_step: MigrationStep,
    pub detail: String,
}

impl MigrationContext {
    pub fn new(movement_id: DbId) -> Self {
        Self {
            movement_id,
            affiliate_id: None,
            interno: None,
            org_codes: Vec::new(),
            period: None,
            payload: None,
            statement: None,
            failed_step: MigrationStep::ResolveMovementCode,
            detail: String::new(),
        }
    }
}

/// Result of one `migrate_movement` call. Returned, never persisted here.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub migration_id: Uuid,
    pub movement_id: DbId,
    pub success: bool,
    pub outcome: MigrationOutcome,
    /// Legacy error code; `0` for every success, including already-active.
    pub legacy_error_code: Option<i64>,
    pub legacy_error_message: Option<String>,
    pub retry_count: u32,
    pub elapsed_ms: u64,
    /// Present on failure.
    pub context: Option<MigrationContext>,
}
