//! Organizational assignment (adscripción) model.

use nomina_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `adscripciones` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrgAssignment {
    pub id: DbId,
    pub affiliate_id: DbId,
    pub org0: String,
    pub org1: String,
    pub org2: Option<String>,
    pub org3: Option<String>,
    pub salary: f64,
    /// Seniority bonus tier (quinquenio).
    pub seniority_tier: Option<i16>,
    /// `B` (base) or `C` (confidence).
    pub base_confidence: String,
    pub percentage: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting an assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrgAssignment {
    pub affiliate_id: DbId,
    pub org0: String,
    pub org1: String,
    pub org2: Option<String>,
    pub org3: Option<String>,
    pub salary: f64,
    pub seniority_tier: Option<i16>,
    pub base_confidence: String,
    pub percentage: i32,
}
