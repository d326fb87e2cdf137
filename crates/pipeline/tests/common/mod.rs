//! Shared fixtures for the migration integration tests: an in-memory
//! personnel store and a scripted legacy driver.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use nomina_core::encoding::{EncodingCorrector, SourceCharset};
use nomina_core::retry::RetryPolicy;
use nomina_core::types::{DbId, Interno};
use nomina_db::models::affectation::{AffectationLogEntry, STATUS_APPLIED};
use nomina_db::models::affiliate::Affiliate;
use nomina_db::models::assignment::OrgAssignment;
use nomina_db::models::movement::{Movement, MovementType};
use nomina_legacy::statement::PROBE_SQL;
use nomina_legacy::{
    DriverError, LegacyConnection, LegacyConnector, LegacyGateway, LegacyRow, LegacyValue,
    ProcedureInvoker, ProcedureNames,
};
use nomina_pipeline::{MigrationOrchestrator, PersonnelStore, SiteConstants};

// ---------------------------------------------------------------------------
// In-memory personnel store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    pub affiliates: Mutex<Vec<Affiliate>>,
    pub assignments: Mutex<Vec<OrgAssignment>>,
    pub movement_types: Mutex<Vec<MovementType>>,
    pub movements: Mutex<Vec<Movement>>,
    pub affectations: Mutex<Vec<AffectationLogEntry>>,
}

impl FakeStore {
    /// Seeded with the standard movement types.
    pub fn new() -> Self {
        let store = Self::default();
        let types = [(1, "AL"), (2, "BA"), (3, "CS"), (4, "LG"), (5, "LS"), (6, "RL"), (9, "ZZ")];
        *store.movement_types.lock().unwrap() = types
            .iter()
            .map(|(id, code)| MovementType {
                id: *id,
                code: code.to_string(),
                description: code.to_string(),
            })
            .collect();
        store
    }

    pub fn interno_of(&self, affiliate_id: DbId) -> Option<Interno> {
        self.affiliates
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == affiliate_id)
            .and_then(|a| a.interno)
    }
}

#[async_trait]
impl PersonnelStore for FakeStore {
    async fn find_movement(&self, id: DbId) -> Result<Option<Movement>, sqlx::Error> {
        Ok(self.movements.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn find_movement_type(&self, id: DbId) -> Result<Option<MovementType>, sqlx::Error> {
        Ok(self.movement_types.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn find_affiliate(&self, id: DbId) -> Result<Option<Affiliate>, sqlx::Error> {
        Ok(self.affiliates.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn first_assignment(&self, affiliate_id: DbId) -> Result<Option<OrgAssignment>, sqlx::Error> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.affiliate_id == affiliate_id)
            .min_by_key(|a| a.id)
            .cloned())
    }

    async fn latest_applied_affectation(
        &self,
        org0: &str,
        org1: &str,
    ) -> Result<Option<AffectationLogEntry>, sqlx::Error> {
        Ok(self
            .affectations
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.org0 == org0 && e.org1 == org1 && e.status == STATUS_APPLIED)
            .max_by_key(|e| (e.created_at, e.id))
            .cloned())
    }

    async fn set_interno(
        &self,
        affiliate_id: DbId,
        interno: Interno,
    ) -> Result<Option<Affiliate>, sqlx::Error> {
        let mut affiliates = self.affiliates.lock().unwrap();
        let Some(row) = affiliates.iter_mut().find(|a| a.id == affiliate_id) else {
            return Ok(None);
        };
        if interno > 0 && row.interno.filter(|i| *i > 0).is_none() {
            row.interno = Some(interno);
        }
        Ok(Some(row.clone()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn affiliate(id: DbId, interno: Option<Interno>) -> Affiliate {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    Affiliate {
        id,
        curp: Some("PEGJ800101HDFRRN01".into()),
        rfc: Some("PEGJ800101AB1".into()),
        employee_number: Some("12345".into()),
        first_name: Some("JUAN".into()),
        paternal_surname: Some("PEREZ".into()),
        maternal_surname: Some("GARCIA".into()),
        birth_date: NaiveDate::from_ymd_opt(1980, 1, 1),
        nss: Some("12345678901".into()),
        street: None,
        street_number: None,
        neighborhood: None,
        postal_code: None,
        phone: None,
        sex: Some("H".into()),
        marital_status: None,
        admission_at: None,
        dependents: None,
        owns_property: None,
        email: None,
        nationality: None,
        interno,
        created_at: created,
        updated_at: created,
    }
}

pub fn assignment(affiliate_id: DbId, percentage: i32, base_confidence: &str) -> OrgAssignment {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    OrgAssignment {
        id: affiliate_id * 10,
        affiliate_id,
        org0: "01".into(),
        org1: "02".into(),
        org2: None,
        org3: None,
        salary: 15000.0,
        seniority_tier: Some(2),
        base_confidence: base_confidence.into(),
        percentage,
        created_at: created,
        updated_at: created,
    }
}

pub fn movement(id: DbId, affiliate_id: DbId, movement_type_id: DbId) -> Movement {
    let created = Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap();
    Movement {
        id,
        affiliate_id,
        movement_type_id,
        effective_date: NaiveDate::from_ymd_opt(2025, 1, 15),
        legacy_synced_at: None,
        legacy_error: None,
        legacy_attempts: 0,
        created_at: created,
        updated_at: created,
    }
}

pub fn applied_period(id: DbId, pay_period: i32, year: i32) -> AffectationLogEntry {
    let created = Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap() + chrono::Duration::minutes(id);
    AffectationLogEntry {
        id,
        org0: "01".into(),
        org1: "02".into(),
        pay_period,
        year,
        status: STATUS_APPLIED.into(),
        created_at: created,
        updated_at: created,
    }
}

/// Affiliate 42 on unit 01/02 (80%, `C`) with a salary-change movement 7
/// dated 2025-01-15 and period 1 of 2025 applied.
pub fn standard_store(interno: Option<Interno>) -> FakeStore {
    let store = FakeStore::new();
    store.affiliates.lock().unwrap().push(affiliate(42, interno));
    store.assignments.lock().unwrap().push(assignment(42, 80, "C"));
    store.movements.lock().unwrap().push(movement(7, 42, 3));
    store.affectations.lock().unwrap().push(applied_period(1, 1, 2025));
    store
}

// ---------------------------------------------------------------------------
// Scripted legacy driver
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedConnection {
    replies: Mutex<VecDeque<Result<Vec<LegacyRow>, DriverError>>>,
    pub calls: Mutex<Vec<(String, Vec<LegacyValue>)>>,
}

impl ScriptedConnection {
    pub fn reply_row(&self, columns: &[(&str, LegacyValue)]) {
        let row = LegacyRow::new(
            columns
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        );
        self.replies.lock().unwrap().push_back(Ok(vec![row]));
    }

    pub fn reply_empty(&self) {
        self.replies.lock().unwrap().push_back(Ok(Vec::new()));
    }

    pub fn reply_error(&self, error: DriverError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn reply_edit(&self, code: i64, message: Option<&str>) {
        self.reply_row(&[
            ("CVE_ERROR", LegacyValue::Int(code)),
            ("MSG_ERROR", message.into()),
        ]);
    }

    pub fn calls(&self) -> Vec<(String, Vec<LegacyValue>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LegacyConnection for ScriptedConnection {
    async fn query(&self, sql: &str, params: &[LegacyValue]) -> Result<Vec<LegacyRow>, DriverError> {
        if sql == PROBE_SQL {
            return Ok(Vec::new());
        }
        self.calls.lock().unwrap().push((sql.to_string(), params.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedConnector {
    pub connection: Arc<ScriptedConnection>,
    pub unreachable: AtomicBool,
}

#[async_trait]
impl LegacyConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Arc<dyn LegacyConnection>, DriverError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DriverError::connection("legacy host unreachable"));
        }
        Ok(Arc::clone(&self.connection) as Arc<dyn LegacyConnection>)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub connector: Arc<ScriptedConnector>,
    pub orchestrator: MigrationOrchestrator,
}

impl Harness {
    pub fn new(store: FakeStore) -> Self {
        let store = Arc::new(store);
        let connector = Arc::new(ScriptedConnector::default());
        let gateway = LegacyGateway::new(
            Arc::clone(&connector) as Arc<dyn LegacyConnector>,
            EncodingCorrector::new(SourceCharset::Windows1252),
        );
        let invoker = ProcedureInvoker::new(
            Arc::new(gateway),
            RetryPolicy::immediate(),
            ProcedureNames::default(),
        );
        let orchestrator = MigrationOrchestrator::new(
            Arc::clone(&store) as Arc<dyn PersonnelStore>,
            invoker,
            SiteConstants::default(),
        );
        Self {
            store,
            connector,
            orchestrator,
        }
    }

    pub fn legacy(&self) -> &ScriptedConnection {
        &self.connector.connection
    }
}
