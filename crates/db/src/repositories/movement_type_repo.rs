//! Repository for the `tipos_movimiento` lookup table.

use nomina_core::types::DbId;
use sqlx::PgPool;

use crate::models::movement::MovementType;

const COLUMNS: &str = "id, clave AS code, descripcion AS description";

/// Provides read access to movement types.
pub struct MovementTypeRepo;

impl MovementTypeRepo {
    /// Find a movement type by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MovementType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tipos_movimiento WHERE id = $1");
        sqlx::query_as::<_, MovementType>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all movement types ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<MovementType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tipos_movimiento ORDER BY id ASC");
        sqlx::query_as::<_, MovementType>(&query)
            .fetch_all(pool)
            .await
    }
}
