//! Read/write seam over the relational store.

use async_trait::async_trait;
use nomina_core::types::{DbId, Interno};
use nomina_db::models::affectation::AffectationLogEntry;
use nomina_db::models::affiliate::Affiliate;
use nomina_db::models::assignment::OrgAssignment;
use nomina_db::models::movement::{Movement, MovementType};
use nomina_db::repositories::{
    AffectationLogRepo, AffiliateRepo, AssignmentRepo, MovementRepo, MovementTypeRepo,
};
use nomina_db::DbPool;

/// The relational-store operations a migration needs.
#[async_trait]
pub trait PersonnelStore: Send + Sync {
    async fn find_movement(&self, id: DbId) -> Result<Option<Movement>, sqlx::Error>;

    async fn find_movement_type(&self, id: DbId) -> Result<Option<MovementType>, sqlx::Error>;

    async fn find_affiliate(&self, id: DbId) -> Result<Option<Affiliate>, sqlx::Error>;

    /// The assignment used for mapping when an affiliate has several.
    async fn first_assignment(&self, affiliate_id: DbId) -> Result<Option<OrgAssignment>, sqlx::Error>;

    async fn latest_applied_affectation(
        &self,
        org0: &str,
        org1: &str,
    ) -> Result<Option<AffectationLogEntry>, sqlx::Error>;

    /// Persist a discovered or generated legacy identity. An existing
    /// positive identity is kept; the stored row is returned.
    async fn set_interno(
        &self,
        affiliate_id: DbId,
        interno: Interno,
    ) -> Result<Option<Affiliate>, sqlx::Error>;
}

/// [`PersonnelStore`] backed by the PostgreSQL repositories.
#[derive(Clone)]
pub struct PgPersonnelStore {
    pool: DbPool,
}

impl PgPersonnelStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonnelStore for PgPersonnelStore {
    async fn find_movement(&self, id: DbId) -> Result<Option<Movement>, sqlx::Error> {
        MovementRepo::find_by_id(&self.pool, id).await
    }

    async fn find_movement_type(&self, id: DbId) -> Result<Option<MovementType>, sqlx::Error> {
        MovementTypeRepo::find_by_id(&self.pool, id).await
    }

    async fn find_affiliate(&self, id: DbId) -> Result<Option<Affiliate>, sqlx::Error> {
        AffiliateRepo::find_by_id(&self.pool, id).await
    }

    async fn first_assignment(&self, affiliate_id: DbId) -> Result<Option<OrgAssignment>, sqlx::Error> {
        AssignmentRepo::first_for_affiliate(&self.pool, affiliate_id).await
    }

    async fn latest_applied_affectation(
        &self,
        org0: &str,
        org1: &str,
    ) -> Result<Option<AffectationLogEntry>, sqlx::Error> {
        AffectationLogRepo::latest_applied(&self.pool, org0, org1).await
    }

    async fn set_interno(
        &self,
        affiliate_id: DbId,
        interno: Interno,
    ) -> Result<Option<Affiliate>, sqlx::Error> {
        AffiliateRepo::set_interno(&self.pool, affiliate_id, interno).await
    }
}
