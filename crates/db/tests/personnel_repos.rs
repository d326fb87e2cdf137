//! Integration tests for the personnel repositories.
//!
//! Exercises the repository layer against a real database:
//! - Affiliate insert and lookup
//! - Legacy identity write-back guard
//! - First-assignment selection
//! - Pending movement bookkeeping
//! - Latest applied affectation lookup

use chrono::NaiveDate;
use sqlx::PgPool;
use nomina_db::models::affectation::{CreateAffectationLogEntry, STATUS_APPLIED};
use nomina_db::models::affiliate::CreateAffiliate;
use nomina_db::models::assignment::CreateOrgAssignment;
use nomina_db::models::movement::CreateMovement;
use nomina_db::repositories::{
    AffectationLogRepo, AffiliateRepo, AssignmentRepo, MovementRepo, MovementTypeRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_affiliate(curp: &str) -> CreateAffiliate {
    CreateAffiliate {
        curp: Some(curp.to_string()),
        rfc: Some("PEGJ800101AB1".to_string()),
        first_name: Some("JUAN".to_string()),
        paternal_surname: Some("PEREZ".to_string()),
        birth_date: NaiveDate::from_ymd_opt(1980, 1, 1),
        ..Default::default()
    }
}

fn new_assignment(affiliate_id: i64, org1: &str) -> CreateOrgAssignment {
    CreateOrgAssignment {
        affiliate_id,
        org0: "01".to_string(),
        org1: org1.to_string(),
        org2: None,
        org3: None,
        salary: 15000.0,
        seniority_tier: Some(2),
        base_confidence: "C".to_string(),
        percentage: 80,
    }
}

fn new_log_entry(pay_period: i32, year: i32, status: &str) -> CreateAffectationLogEntry {
    CreateAffectationLogEntry {
        org0: "01".to_string(),
        org1: "02".to_string(),
        pay_period,
        year,
        status: Some(status.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Affiliates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_find_affiliate(pool: PgPool) {
    let created = AffiliateRepo::create(&pool, &new_affiliate("PEGJ800101HDFRRN01"))
        .await
        .unwrap();
    assert_eq!(created.first_name.as_deref(), Some("JUAN"));
    assert!(created.legacy_identity().is_none());

    let by_id = AffiliateRepo::find_by_id(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(by_id.curp, created.curp);

    let by_curp = AffiliateRepo::find_by_curp(&pool, "PEGJ800101HDFRRN01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_curp.id, created.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_interno_writes_once(pool: PgPool) {
    let affiliate = AffiliateRepo::create(&pool, &new_affiliate("AAAA000000HDFRRN01"))
        .await
        .unwrap();

    let updated = AffiliateRepo::set_interno(&pool, affiliate.id, 778899)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.interno, Some(778899));

    // A second, different identity must not replace the first.
    let again = AffiliateRepo::set_interno(&pool, affiliate.id, 111)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.interno, Some(778899));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_interno_ignores_non_positive(pool: PgPool) {
    let affiliate = AffiliateRepo::create(&pool, &new_affiliate("BBBB000000HDFRRN01"))
        .await
        .unwrap();

    let row = AffiliateRepo::set_interno(&pool, affiliate.id, 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.interno, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_interno_missing_affiliate(pool: PgPool) {
    let row = AffiliateRepo::set_interno(&pool, 999_999, 5).await.unwrap();
    assert!(row.is_none());
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_assignment_is_lowest_id(pool: PgPool) {
    let affiliate = AffiliateRepo::create(&pool, &new_affiliate("CCCC000000HDFRRN01"))
        .await
        .unwrap();
    let first = AssignmentRepo::create(&pool, &new_assignment(affiliate.id, "02"))
        .await
        .unwrap();
    AssignmentRepo::create(&pool, &new_assignment(affiliate.id, "03"))
        .await
        .unwrap();

    let found = AssignmentRepo::first_for_affiliate(&pool, affiliate.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);
    assert_eq!(found.org1, "02");

    let all = AssignmentRepo::list_by_affiliate(&pool, affiliate.id).await.unwrap();
    assert_eq!(all.len(), 2);
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_movement_types_are_seeded(pool: PgPool) {
    let cs = MovementTypeRepo::find_by_id(&pool, 3).await.unwrap().unwrap();
    assert_eq!(cs.code, "CS");
    let all = MovementTypeRepo::list(&pool).await.unwrap();
    assert_eq!(all.len(), 6);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_movements_and_sync_outcomes(pool: PgPool) {
    let affiliate = AffiliateRepo::create(&pool, &new_affiliate("DDDD000000HDFRRN01"))
        .await
        .unwrap();
    let m1 = MovementRepo::create(
        &pool,
        &CreateMovement {
            affiliate_id: affiliate.id,
            movement_type_id: 3,
            effective_date: NaiveDate::from_ymd_opt(2025, 1, 15),
        },
    )
    .await
    .unwrap();
    let m2 = MovementRepo::create(
        &pool,
        &CreateMovement {
            affiliate_id: affiliate.id,
            movement_type_id: 1,
            effective_date: None,
        },
    )
    .await
    .unwrap();

    let pending = MovementRepo::list_pending(&pool, 10).await.unwrap();
    assert_eq!(pending.iter().map(|m| m.id).collect::<Vec<_>>(), vec![m1.id, m2.id]);

    assert!(MovementRepo::record_sync_failure(&pool, m2.id, "legacy code 5")
        .await
        .unwrap());
    assert!(MovementRepo::record_sync_success(&pool, m1.id).await.unwrap());

    let pending = MovementRepo::list_pending(&pool, 10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, m2.id);
    assert_eq!(pending[0].legacy_error.as_deref(), Some("legacy code 5"));
    assert_eq!(pending[0].legacy_attempts, 1);

    let synced = MovementRepo::find_by_id(&pool, m1.id).await.unwrap().unwrap();
    assert!(synced.legacy_synced_at.is_some());
    assert!(synced.legacy_error.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_effective_date_falls_back_to_creation(pool: PgPool) {
    let affiliate = AffiliateRepo::create(&pool, &new_affiliate("EEEE000000HDFRRN01"))
        .await
        .unwrap();
    let m = MovementRepo::create(
        &pool,
        &CreateMovement {
            affiliate_id: affiliate.id,
            movement_type_id: 2,
            effective_date: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(m.effective_or_created(), m.created_at.date_naive());
}

// ---------------------------------------------------------------------------
// Affectation log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_latest_applied_skips_pending_entries(pool: PgPool) {
    AffectationLogRepo::create(&pool, &new_log_entry(23, 2024, STATUS_APPLIED))
        .await
        .unwrap();
    let latest = AffectationLogRepo::create(&pool, &new_log_entry(1, 2025, STATUS_APPLIED))
        .await
        .unwrap();
    AffectationLogRepo::create(&pool, &new_log_entry(2, 2025, "pendiente"))
        .await
        .unwrap();

    let found = AffectationLogRepo::latest_applied(&pool, "01", "02")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, latest.id);
    assert_eq!(found.pay_period, 1);
    assert_eq!(found.year, 2025);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_latest_applied_none_for_unknown_unit(pool: PgPool) {
    let found = AffectationLogRepo::latest_applied(&pool, "99", "99")
        .await
        .unwrap();
    assert!(found.is_none());
}
