//! Organizational-affectation log model.

use nomina_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status value of a log entry whose affectation reached the legacy store.
pub const STATUS_APPLIED: &str = "aplicado";

/// A row from the `bitacora_afectaciones` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AffectationLogEntry {
    pub id: DbId,
    pub org0: String,
    pub org1: String,
    /// Quincena of the year, 1..=24.
    pub pay_period: i32,
    pub year: i32,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAffectationLogEntry {
    pub org0: String,
    pub org1: String,
    pub pay_period: i32,
    pub year: i32,
    pub status: Option<String>,
}
