//! Repository for the `movimientos` table, including legacy sync status.

use nomina_core::types::DbId;
use sqlx::PgPool;

use crate::models::movement::{CreateMovement, Movement};

/// Column list for movimientos queries.
const COLUMNS: &str = "id, afiliado_id AS affiliate_id, \
    tipo_movimiento_id AS movement_type_id, fecha_efectiva AS effective_date, \
    legacy_synced_at, legacy_error, legacy_attempts, created_at, updated_at";

/// Provides access to movements and their sync bookkeeping.
pub struct MovementRepo;

impl MovementRepo {
    /// Insert a movement, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateMovement) -> Result<Movement, sqlx::Error> {
        let query = format!(
            "INSERT INTO movimientos (afiliado_id, tipo_movimiento_id, fecha_efectiva)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Movement>(&query)
            .bind(input.affiliate_id)
            .bind(input.movement_type_id)
            .bind(input.effective_date)
            .fetch_one(pool)
            .await
    }

    /// Find a movement by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Movement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM movimientos WHERE id = $1");
        sqlx::query_as::<_, Movement>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Movements not yet mirrored into the legacy store, oldest first.
    pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<Movement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM movimientos
             WHERE legacy_synced_at IS NULL
             ORDER BY id ASC
             LIMIT $1"
        );
        sqlx::query_as::<_, Movement>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Stamp a movement as mirrored and clear any previous error.
    pub async fn record_sync_success(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE movimientos SET
                legacy_synced_at = NOW(),
                legacy_error = NULL,
                legacy_attempts = legacy_attempts + 1
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed sync attempt, leaving the movement pending.
    pub async fn record_sync_failure(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE movimientos SET
                legacy_error = $2,
                legacy_attempts = legacy_attempts + 1
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
