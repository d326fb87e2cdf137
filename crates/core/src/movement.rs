//! Movement vocabulary, payload field validation and interpretation of
//! the legacy entity-edit result.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lowest accepted legacy percentage.
pub const MIN_PERCENTAGE: i32 = 60;

/// Highest accepted legacy percentage.
pub const MAX_PERCENTAGE: i32 = 100;

/// Legacy error code meaning the target state already exists.
pub const ALREADY_ACTIVE_ERROR_CODE: i64 = 23;

/// Message fragments the legacy store uses for the same condition.
/// Secondary signal only; the error code wins.
const ALREADY_ACTIVE_PHRASES: &[&str] = &["ya está activo", "ya esta activo"];

// ---------------------------------------------------------------------------
// Movement code
// ---------------------------------------------------------------------------

/// Two-letter code identifying the kind of personnel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementCode {
    /// Hire (alta).
    #[serde(rename = "AL")]
    Hire,
    /// Termination (baja).
    #[serde(rename = "BA")]
    Termination,
    /// Paid leave (licencia con goce).
    #[serde(rename = "LG")]
    PaidLeave,
    /// Unpaid leave (licencia sin goce).
    #[serde(rename = "LS")]
    UnpaidLeave,
    /// Return from leave (reanudación).
    #[serde(rename = "RL")]
    LeaveReturn,
    /// Salary change (cambio de sueldo).
    #[serde(rename = "CS")]
    SalaryChange,
}

impl MovementCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hire => "AL",
            Self::Termination => "BA",
            Self::PaidLeave => "LG",
            Self::UnpaidLeave => "LS",
            Self::LeaveReturn => "RL",
            Self::SalaryChange => "CS",
        }
    }

    /// Parse a code as stored in `tipos_movimiento.clave`. Case and
    /// surrounding whitespace are ignored.
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AL" => Some(Self::Hire),
            "BA" => Some(Self::Termination),
            "LG" => Some(Self::PaidLeave),
            "LS" => Some(Self::UnpaidLeave),
            "RL" => Some(Self::LeaveReturn),
            "CS" => Some(Self::SalaryChange),
            _ => None,
        }
    }

    /// All valid codes.
    pub const ALL: &'static [&'static str] = &["AL", "BA", "LG", "LS", "RL", "CS"];
}

impl std::fmt::Display for MovementCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the legacy percentage (60..=100 inclusive).
pub fn validate_percentage(percentage: i32) -> Result<i32, CoreError> {
    if (MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&percentage) {
        Ok(percentage)
    } else {
        Err(CoreError::Validation(format!(
            "Percentage must be between {MIN_PERCENTAGE} and {MAX_PERCENTAGE}, got {percentage}"
        )))
    }
}

/// Validate and normalize the base/confidence flag to `'B'` or `'C'`.
pub fn validate_base_confidence(value: &str) -> Result<char, CoreError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "B" => Ok('B'),
        "C" => Ok('C'),
        other => Err(CoreError::Validation(format!(
            "Base/confidence flag must be 'B' or 'C', got '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Result classification
// ---------------------------------------------------------------------------

/// Business meaning of an entity-edit result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditResultClass {
    /// Code 0: the movement was applied.
    Applied,
    /// The legacy store already holds the target state.
    AlreadyActive,
    /// Any other positive code.
    Rejected,
}

impl EditResultClass {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied | Self::AlreadyActive)
    }
}

/// Classify the `(error code, message)` pair returned by the legacy
/// entity-edit procedure.
///
/// Code 23 is the primary duplicate signal; the message phrase is only a
/// fallback for legacy builds that report the condition with another code.
pub fn classify_edit_result(error_code: i64, message: Option<&str>) -> EditResultClass {
    if error_code == 0 {
        return EditResultClass::Applied;
    }
    if error_code == ALREADY_ACTIVE_ERROR_CODE {
        return EditResultClass::AlreadyActive;
    }
    let mentions_active = message
        .map(|m| m.to_lowercase())
        .is_some_and(|m| ALREADY_ACTIVE_PHRASES.iter().any(|p| m.contains(p)));
    if mentions_active {
        EditResultClass::AlreadyActive
    } else {
        EditResultClass::Rejected
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
