//! Repository for the `adscripciones` table.

use nomina_core::types::DbId;
use sqlx::PgPool;

use crate::models::assignment::{CreateOrgAssignment, OrgAssignment};

/// Column list for adscripciones queries.
const COLUMNS: &str = "id, afiliado_id AS affiliate_id, org0, org1, org2, org3, \
    sueldo AS salary, quinquenio AS seniority_tier, bc AS base_confidence, \
    porcentaje AS percentage, created_at, updated_at";

/// Provides access to organizational assignments.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Insert an assignment, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrgAssignment,
    ) -> Result<OrgAssignment, sqlx::Error> {
        let query = format!(
            "INSERT INTO adscripciones
                (afiliado_id, org0, org1, org2, org3, sueldo, quinquenio, bc, porcentaje)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrgAssignment>(&query)
            .bind(input.affiliate_id)
            .bind(&input.org0)
            .bind(&input.org1)
            .bind(&input.org2)
            .bind(&input.org3)
            .bind(input.salary)
            .bind(input.seniority_tier)
            .bind(&input.base_confidence)
            .bind(input.percentage)
            .fetch_one(pool)
            .await
    }

    /// List every assignment of an affiliate, oldest first.
    pub async fn list_by_affiliate(
        pool: &PgPool,
        affiliate_id: DbId,
    ) -> Result<Vec<OrgAssignment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM adscripciones WHERE afiliado_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, OrgAssignment>(&query)
            .bind(affiliate_id)
            .fetch_all(pool)
            .await
    }

    /// The first assignment of an affiliate (lowest id).
    pub async fn first_for_affiliate(
        pool: &PgPool,
        affiliate_id: DbId,
    ) -> Result<Option<OrgAssignment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM adscripciones WHERE afiliado_id = $1 ORDER BY id ASC LIMIT 1"
        );
        sqlx::query_as::<_, OrgAssignment>(&query)
            .bind(affiliate_id)
            .fetch_optional(pool)
            .await
    }
}
