//! Repository for the `bitacora_afectaciones` table.

use sqlx::PgPool;

use crate::models::affectation::{AffectationLogEntry, CreateAffectationLogEntry, STATUS_APPLIED};

/// Column list for bitacora_afectaciones queries.
const COLUMNS: &str = "id, org0, org1, quincena AS pay_period, anio AS year, \
    estatus AS status, created_at, updated_at";

/// Default status for new log entries.
const STATUS_PENDING: &str = "pendiente";

/// Provides access to the organizational-affectation log.
pub struct AffectationLogRepo;

impl AffectationLogRepo {
    /// Insert a log entry, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAffectationLogEntry,
    ) -> Result<AffectationLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO bitacora_afectaciones (org0, org1, quincena, anio, estatus)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AffectationLogEntry>(&query)
            .bind(&input.org0)
            .bind(&input.org1)
            .bind(input.pay_period)
            .bind(input.year)
            .bind(input.status.as_deref().unwrap_or(STATUS_PENDING))
            .fetch_one(pool)
            .await
    }

    /// The most recent applied entry for an organizational unit.
    pub async fn latest_applied(
        pool: &PgPool,
        org0: &str,
        org1: &str,
    ) -> Result<Option<AffectationLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bitacora_afectaciones
             WHERE org0 = $1 AND org1 = $2 AND estatus = $3
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, AffectationLogEntry>(&query)
            .bind(org0)
            .bind(org1)
            .bind(STATUS_APPLIED)
            .fetch_optional(pool)
            .await
    }
}
