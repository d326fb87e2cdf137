//! Repository for the `afiliados` table.

use nomina_core::types::{DbId, Interno};
use sqlx::PgPool;

use crate::models::affiliate::{Affiliate, CreateAffiliate};

/// Column list for afiliados queries, aliased to the model field names.
const COLUMNS: &str = "id, curp, rfc, num_empleado AS employee_number, \
    nombre AS first_name, apellido_paterno AS paternal_surname, \
    apellido_materno AS maternal_surname, fecha_nacimiento AS birth_date, nss, \
    calle AS street, numero_exterior AS street_number, colonia AS neighborhood, \
    codigo_postal AS postal_code, telefono AS phone, sexo AS sex, \
    estado_civil AS marital_status, fecha_ingreso AS admission_at, \
    dependientes AS dependents, tiene_propiedad AS owns_property, email, \
    nacionalidad AS nationality, interno, created_at, updated_at";

/// Provides access to affiliate rows.
pub struct AffiliateRepo;

impl AffiliateRepo {
    /// Insert a new affiliate, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateAffiliate) -> Result<Affiliate, sqlx::Error> {
        let query = format!(
            "INSERT INTO afiliados
                (curp, rfc, num_empleado, nombre, apellido_paterno, apellido_materno,
                 fecha_nacimiento, nss, calle, numero_exterior, colonia, codigo_postal,
                 telefono, sexo, estado_civil, fecha_ingreso, dependientes,
                 tiene_propiedad, email, nacionalidad, interno)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, $17, $18, $19, $20, $21)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Affiliate>(&query)
            .bind(&input.curp)
            .bind(&input.rfc)
            .bind(&input.employee_number)
            .bind(&input.first_name)
            .bind(&input.paternal_surname)
            .bind(&input.maternal_surname)
            .bind(input.birth_date)
            .bind(&input.nss)
            .bind(&input.street)
            .bind(&input.street_number)
            .bind(&input.neighborhood)
            .bind(&input.postal_code)
            .bind(&input.phone)
            .bind(&input.sex)
            .bind(&input.marital_status)
            .bind(input.admission_at)
            .bind(input.dependents)
            .bind(input.owns_property)
            .bind(&input.email)
            .bind(&input.nationality)
            .bind(input.interno)
            .fetch_one(pool)
            .await
    }

    /// Find an affiliate by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Affiliate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM afiliados WHERE id = $1");
        sqlx::query_as::<_, Affiliate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an affiliate by national ID.
    pub async fn find_by_curp(pool: &PgPool, curp: &str) -> Result<Option<Affiliate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM afiliados WHERE curp = $1");
        sqlx::query_as::<_, Affiliate>(&query)
            .bind(curp)
            .fetch_optional(pool)
            .await
    }

    /// Record the legacy identity of an affiliate.
    ///
    /// Only writes when the stored value is NULL or non-positive and the
    /// new value is positive. Returns the row as it stands afterwards, or
    /// `None` if the affiliate does not exist.
    pub async fn set_interno(
        pool: &PgPool,
        id: DbId,
        interno: Interno,
    ) -> Result<Option<Affiliate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current: Option<(Option<Interno>,)> =
            sqlx::query_as("SELECT interno FROM afiliados WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((current,)) = current else {
            return Ok(None);
        };

        match current {
            Some(existing) if existing > 0 => {
                if existing != interno {
                    tracing::warn!(
                        affiliate_id = id,
                        existing,
                        proposed = interno,
                        "Refusing to overwrite legacy identity",
                    );
                }
            }
            _ if interno > 0 => {
                sqlx::query("UPDATE afiliados SET interno = $2 WHERE id = $1")
                    .bind(id)
                    .bind(interno)
                    .execute(&mut *tx)
                    .await?;
            }
            _ => {}
        }

        let query = format!("SELECT {COLUMNS} FROM afiliados WHERE id = $1");
        let row = sqlx::query_as::<_, Affiliate>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }
}
