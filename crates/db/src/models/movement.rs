//! Movement and movement-type models.

use chrono::NaiveDate;
use nomina_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `tipos_movimiento` lookup table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovementType {
    pub id: DbId,
    /// Two-letter legacy movement code.
    pub code: String,
    pub description: String,
}

/// A row from the `movimientos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Movement {
    pub id: DbId,
    pub affiliate_id: DbId,
    pub movement_type_id: DbId,
    pub effective_date: Option<NaiveDate>,
    pub legacy_synced_at: Option<Timestamp>,
    pub legacy_error: Option<String>,
    pub legacy_attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Movement {
    /// Effective date, falling back to the creation date.
    pub fn effective_or_created(&self) -> NaiveDate {
        self.effective_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }
}

/// DTO for inserting a movement.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovement {
    pub affiliate_id: DbId,
    pub movement_type_id: DbId,
    pub effective_date: Option<NaiveDate>,
}
