//! Translation of relational entities into legacy procedure arguments.
//!
//! Everything here is pure. Strings are truncated to the legacy column
//! widths, dates reformatted, and free-text codes mapped through the
//! lookup tables in [`nomina_core::legacy_format`].

use std::sync::LazyLock;

use nomina_core::encoding::EncodingCorrector;
use nomina_core::legacy_format::{
    format_legacy_date, format_legacy_timestamp, marital_status_code, nationality_code,
    property_flag, sex_code, truncate, truncate_opt, CURP_WIDTH, EMAIL_WIDTH,
    EMPLOYEE_NUMBER_WIDTH, NAME_WIDTH, NEIGHBORHOOD_WIDTH, NSS_WIDTH, ORG_CODE_WIDTH,
    PERIOD_WIDTH, PHONE_WIDTH, POSTAL_CODE_WIDTH, RFC_WIDTH, STREET_WIDTH, SURNAME_WIDTH,
};
use nomina_core::movement::{validate_base_confidence, validate_percentage, MovementCode};
use nomina_core::types::Interno;
use nomina_db::models::affiliate::Affiliate;
use nomina_db::models::assignment::OrgAssignment;
use nomina_db::models::movement::Movement;
use nomina_legacy::LegacyValue;
use regex::Regex;
use serde::Serialize;

use crate::error::MigrationError;

/// Positional parameters of "create affiliate".
pub const CREATE_AFFILIATE_ARITY: usize = 24;

/// Positional parameters of "edit entity".
pub const EDIT_ENTITY_ARITY: usize = 14;

static CURP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{18}$").expect("valid regex"));
static RFC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-ZÑ&0-9]{12,13}$").expect("valid regex"));
static NSS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{11}$").expect("valid regex"));

/// Site-wide constants sent with every "create affiliate" call.
#[derive(Debug, Clone)]
pub struct SiteConstants {
    pub locality: String,
    pub municipality: String,
    pub state: String,
    pub country: String,
}

impl Default for SiteConstants {
    fn default() -> Self {
        Self {
            locality: "0001".to_string(),
            municipality: "001".to_string(),
            state: "09".to_string(),
            country: "MEX".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Create affiliate
// ---------------------------------------------------------------------------

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Required fields for "create affiliate" that are absent.
pub fn missing_required_fields(affiliate: &Affiliate) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !present(affiliate.curp.as_deref()) {
        missing.push("curp");
    }
    if !present(affiliate.first_name.as_deref()) {
        missing.push("first_name");
    }
    if !present(affiliate.paternal_surname.as_deref()) {
        missing.push("paternal_surname");
    }
    missing
}

/// Build the 24 positional arguments of "create affiliate".
///
/// Fails when CURP, first name or paternal surname is missing. Name and
/// address text is repaired with `corrector` before truncation.
pub fn map_affiliate_for_create(
    affiliate: &Affiliate,
    site: &SiteConstants,
    corrector: &EncodingCorrector,
) -> Result<Vec<LegacyValue>, MigrationError> {
    let missing = missing_required_fields(affiliate);
    if !missing.is_empty() {
        return Err(MigrationError::Validation(format!(
            "Affiliate {} is missing required fields: {}",
            affiliate.id,
            missing.join(", ")
        )));
    }

    let text = |value: Option<&str>, field: &str, width: usize| -> LegacyValue {
        let repaired = value.map(|v| corrector.decode_str(v, Some(field)));
        LegacyValue::Text(truncate_opt(repaired.as_deref(), width))
    };

    let street = match (affiliate.street.as_deref(), affiliate.street_number.as_deref()) {
        (Some(s), Some(n)) if !n.trim().is_empty() => Some(format!("{} {}", s.trim(), n.trim())),
        (Some(s), _) => Some(s.to_string()),
        (None, n) => n.map(str::to_string),
    };
    let admission = affiliate.admission_at.unwrap_or(affiliate.created_at).naive_utc();

    let args = vec![
        LegacyValue::Int(0),
        LegacyValue::Text(truncate_opt(affiliate.curp.as_deref(), CURP_WIDTH).to_uppercase()),
        LegacyValue::Text(truncate_opt(affiliate.rfc.as_deref(), RFC_WIDTH).to_uppercase()),
        LegacyValue::Text(truncate_opt(affiliate.employee_number.as_deref(), EMPLOYEE_NUMBER_WIDTH)),
        text(affiliate.first_name.as_deref(), "NOMBRE", NAME_WIDTH),
        text(affiliate.paternal_surname.as_deref(), "APELLIDO_PATERNO", SURNAME_WIDTH),
        text(affiliate.maternal_surname.as_deref(), "APELLIDO_MATERNO", SURNAME_WIDTH),
        affiliate.birth_date.map(format_legacy_date).into(),
        LegacyValue::Text(truncate_opt(affiliate.nss.as_deref(), NSS_WIDTH)),
        text(street.as_deref(), "CALLE", STREET_WIDTH),
        text(affiliate.neighborhood.as_deref(), "COLONIA", NEIGHBORHOOD_WIDTH),
        LegacyValue::Text(truncate_opt(affiliate.postal_code.as_deref(), POSTAL_CODE_WIDTH)),
        LegacyValue::Text(truncate_opt(affiliate.phone.as_deref(), PHONE_WIDTH)),
        LegacyValue::Text(sex_code(affiliate.sex.as_deref())),
        LegacyValue::from(marital_status_code(affiliate.marital_status.as_deref())),
        LegacyValue::Text(format_legacy_timestamp(admission)),
        LegacyValue::from(site.locality.as_str()),
        LegacyValue::from(site.municipality.as_str()),
        LegacyValue::from(site.state.as_str()),
        LegacyValue::from(site.country.as_str()),
        LegacyValue::Int(i64::from(affiliate.dependents.unwrap_or(0))),
        LegacyValue::from(property_flag(affiliate.owns_property)),
        LegacyValue::Text(truncate_opt(affiliate.email.as_deref(), EMAIL_WIDTH)),
        LegacyValue::from(nationality_code(affiliate.nationality.as_deref())),
    ];
    debug_assert_eq!(args.len(), CREATE_AFFILIATE_ARITY);
    Ok(args)
}

/// Explain why the legacy store may have refused to create `affiliate`.
pub fn diagnose_identity(affiliate: &Affiliate) -> Vec<String> {
    let mut problems = Vec::new();

    match affiliate.curp.as_deref().map(|c| c.trim().to_uppercase()) {
        None => problems.push("CURP is missing".to_string()),
        Some(c) if !CURP_RE.is_match(&c) => {
            problems.push(format!("CURP '{c}' is not 18 alphanumeric characters"))
        }
        Some(_) => {}
    }
    match affiliate.rfc.as_deref().map(|r| r.trim().to_uppercase()) {
        None => problems.push("RFC is missing".to_string()),
        Some(r) if !RFC_RE.is_match(&r) => {
            problems.push(format!("RFC '{r}' is not 12-13 alphanumeric characters"))
        }
        Some(_) => {}
    }
    match affiliate.nss.as_deref().map(str::trim) {
        None => problems.push("NSS is missing".to_string()),
        Some(n) if !NSS_RE.is_match(n) => problems.push(format!("NSS '{n}' is not 11 digits")),
        Some(_) => {}
    }
    if !present(affiliate.first_name.as_deref()) {
        problems.push("First name is missing".to_string());
    }
    if !present(affiliate.paternal_surname.as_deref()) {
        problems.push("Paternal surname is missing".to_string());
    }
    if affiliate.birth_date.is_none() {
        problems.push("Birth date is missing".to_string());
    }

    problems
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Movement data mapped from the relational store, before validation and
/// before the legacy identity and period are known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementDraft {
    pub org0: String,
    pub org1: String,
    pub org2: String,
    pub org3: String,
    pub salary: f64,
    pub seniority_tier: i32,
    pub movement_code: MovementCode,
    /// Effective date as `mm/dd/yy`.
    pub date: String,
    pub base_confidence: String,
    pub percentage: i32,
}

/// Map a movement and its assignment into a [`MovementDraft`].
pub fn map_movement(
    movement: &Movement,
    code: MovementCode,
    assignment: &OrgAssignment,
) -> MovementDraft {
    MovementDraft {
        org0: truncate(&assignment.org0, ORG_CODE_WIDTH),
        org1: truncate(&assignment.org1, ORG_CODE_WIDTH),
        org2: truncate_opt(assignment.org2.as_deref(), ORG_CODE_WIDTH),
        org3: truncate_opt(assignment.org3.as_deref(), ORG_CODE_WIDTH),
        salary: assignment.salary,
        seniority_tier: assignment.seniority_tier.map(i32::from).unwrap_or(0),
        movement_code: code,
        date: format_legacy_date(movement.effective_or_created()),
        base_confidence: assignment.base_confidence.clone(),
        percentage: assignment.percentage,
    }
}

impl MovementDraft {
    /// Organizational codes, levels 0 to 3.
    pub fn org_codes(&self) -> Vec<String> {
        vec![
            self.org0.clone(),
            self.org1.clone(),
            self.org2.clone(),
            self.org3.clone(),
        ]
    }

    /// Check percentage and base/confidence flag.
    pub fn validate(&self) -> Result<(), MigrationError> {
        validate_percentage(self.percentage)?;
        validate_base_confidence(&self.base_confidence)?;
        Ok(())
    }

    /// Complete the draft with the legacy identity and period.
    pub fn into_payload(
        self,
        interno: Interno,
        period: &str,
    ) -> Result<LegacyMovementPayload, MigrationError> {
        let percentage = validate_percentage(self.percentage)?;
        let base_confidence = validate_base_confidence(&self.base_confidence)?;
        if interno <= 0 {
            return Err(MigrationError::Validation(format!(
                "Legacy identity must be positive, got {interno}"
            )));
        }
        if period.chars().count() != PERIOD_WIDTH {
            return Err(MigrationError::Validation(format!(
                "Period code must be {PERIOD_WIDTH} characters, got '{period}'"
            )));
        }

        Ok(LegacyMovementPayload {
            interno,
            org0: self.org0,
            org1: self.org1,
            org2: self.org2,
            org3: self.org3,
            salary: self.salary,
            operation: 0,
            seniority_tier: self.seniority_tier,
            retroactive: 0,
            period: period.to_string(),
            movement_code: self.movement_code,
            date: self.date,
            base_confidence,
            percentage,
        })
    }
}

/// Validated arguments of "edit entity". Serialized with the legacy
/// parameter names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyMovementPayload {
    pub interno: Interno,
    pub org0: String,
    pub org1: String,
    pub org2: String,
    pub org3: String,
    #[serde(rename = "sueldo")]
    pub salary: f64,
    #[serde(rename = "op")]
    pub operation: i32,
    #[serde(rename = "q")]
    pub seniority_tier: i32,
    #[serde(rename = "retroactivas")]
    pub retroactive: i32,
    #[serde(rename = "periodo")]
    pub period: String,
    #[serde(rename = "movimiento")]
    pub movement_code: MovementCode,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "bc")]
    pub base_confidence: char,
    #[serde(rename = "porc")]
    pub percentage: i32,
}

impl LegacyMovementPayload {
    /// The 14 positional arguments, in procedure order.
    pub fn to_arguments(&self) -> Vec<LegacyValue> {
        vec![
            LegacyValue::from(self.interno),
            LegacyValue::from(self.org0.as_str()),
            LegacyValue::from(self.org1.as_str()),
            LegacyValue::from(self.org2.as_str()),
            LegacyValue::from(self.org3.as_str()),
            LegacyValue::Float(self.salary),
            LegacyValue::from(self.operation),
            LegacyValue::from(self.seniority_tier),
            LegacyValue::from(self.retroactive),
            LegacyValue::from(self.period.as_str()),
            LegacyValue::from(self.movement_code.as_str()),
            LegacyValue::from(self.date.as_str()),
            LegacyValue::from(self.base_confidence),
            LegacyValue::from(self.percentage),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone, Utc};
    use nomina_core::encoding::SourceCharset;

    use super::*;

    fn affiliate() -> Affiliate {
        let created = Utc.with_ymd_and_hms(2024, 12, 3, 8, 5, 9).unwrap();
        Affiliate {
            id: 42,
            curp: Some("pegj800101hdfrrn01".into()),
            rfc: Some("PEGJ800101AB1".into()),
            employee_number: Some("000123456789".into()),
            first_name: Some("JUAN CARLOS".into()),
            paternal_surname: Some("MUNOZ".into()),
            maternal_surname: None,
            birth_date: NaiveDate::from_ymd_opt(1980, 1, 1),
            nss: Some("12345678901".into()),
            street: Some("AV. REFORMA".into()),
            street_number: Some("12".into()),
            neighborhood: Some("CENTRO".into()),
            postal_code: Some("060001".into()),
            phone: None,
            sex: Some("Hombre".into()),
            marital_status: Some("casado".into()),
            admission_at: None,
            dependents: None,
            owns_property: None,
            email: None,
            nationality: None,
            interno: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn assignment() -> OrgAssignment {
        let now = Utc::now();
        OrgAssignment {
            id: 1,
            affiliate_id: 42,
            org0: "01".into(),
            org1: "02".into(),
            org2: None,
            org3: None,
            salary: 15000.0,
            seniority_tier: Some(2),
            base_confidence: "c".into(),
            percentage: 80,
            created_at: now,
            updated_at: now,
        }
    }

    fn movement(effective: Option<NaiveDate>) -> Movement {
        let created = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
        Movement {
            id: 7,
            affiliate_id: 42,
            movement_type_id: 3,
            effective_date: effective,
            legacy_synced_at: None,
            legacy_error: None,
            legacy_attempts: 0,
            created_at: created,
            updated_at: created,
        }
    }

    fn corrector() -> EncodingCorrector {
        EncodingCorrector::new(SourceCharset::Windows1252)
    }

    // ---- Create affiliate ----

    #[test]
    fn create_arguments_follow_procedure_order() {
        let args = map_affiliate_for_create(&affiliate(), &SiteConstants::default(), &corrector())
            .unwrap();

        assert_eq!(args.len(), CREATE_AFFILIATE_ARITY);
        assert_eq!(args[0], LegacyValue::Int(0));
        assert_eq!(args[1], LegacyValue::Text("PEGJ800101HDFRRN01".into()));
        assert_eq!(args[3], LegacyValue::Text("0001234567".into()));
        assert_eq!(args[5], LegacyValue::Text("MUÑOZ".into()));
        assert_eq!(args[6], LegacyValue::Text(String::new()));
        assert_eq!(args[7], LegacyValue::Text("01/01/80".into()));
        assert_eq!(args[9], LegacyValue::Text("AV. REFORMA 12".into()));
        assert_eq!(args[11], LegacyValue::Text("06000".into()));
        assert_eq!(args[13], LegacyValue::Text("H".into()));
        assert_eq!(args[14], LegacyValue::Text("C".into()));
        assert_eq!(args[15], LegacyValue::Text("12/03/2024 08:05:09".into()));
        assert_eq!(args[19], LegacyValue::Text("MEX".into()));
    }

    #[test]
    fn create_defaults_for_absent_optionals() {
        let args = map_affiliate_for_create(&affiliate(), &SiteConstants::default(), &corrector())
            .unwrap();

        assert_eq!(args[20], LegacyValue::Int(0));
        assert_eq!(args[21], LegacyValue::Text("N".into()));
        assert_eq!(args[22], LegacyValue::Text(String::new()));
        assert_eq!(args[23], LegacyValue::Text("M".into()));
    }

    #[test]
    fn create_truncates_long_names() {
        let mut a = affiliate();
        a.first_name = Some("X".repeat(50));
        let args = map_affiliate_for_create(&a, &SiteConstants::default(), &corrector()).unwrap();
        assert_eq!(args[4], LegacyValue::Text("X".repeat(NAME_WIDTH)));
    }

    #[test]
    fn create_requires_curp_and_names() {
        let mut a = affiliate();
        a.curp = None;
        a.paternal_surname = Some("  ".into());
        let err = map_affiliate_for_create(&a, &SiteConstants::default(), &corrector()).unwrap_err();
        assert_matches!(err, MigrationError::Validation(ref msg) if msg.contains("curp") && msg.contains("paternal_surname"));
    }

    #[test]
    fn missing_birth_date_maps_to_null() {
        let mut a = affiliate();
        a.birth_date = None;
        let args = map_affiliate_for_create(&a, &SiteConstants::default(), &corrector()).unwrap();
        assert_eq!(args[7], LegacyValue::Null);
    }

    #[test]
    fn diagnostics_flag_malformed_identifiers() {
        let mut a = affiliate();
        a.curp = Some("SHORT".into());
        a.nss = Some("123".into());
        a.birth_date = None;
        let problems = diagnose_identity(&a);
        assert_eq!(problems.len(), 3, "{problems:?}");
        assert!(problems[0].contains("CURP"));
        assert!(problems[1].contains("NSS"));
        assert!(problems[2].contains("Birth date"));
    }

    #[test]
    fn diagnostics_empty_for_valid_affiliate() {
        assert!(diagnose_identity(&affiliate()).is_empty());
    }

    // ---- Movement ----

    #[test]
    fn movement_uses_effective_date() {
        let draft = map_movement(
            &movement(NaiveDate::from_ymd_opt(2025, 1, 15)),
            MovementCode::SalaryChange,
            &assignment(),
        );
        assert_eq!(draft.date, "01/15/25");
        assert_eq!(draft.org2, "");
        assert_eq!(draft.seniority_tier, 2);
    }

    #[test]
    fn movement_falls_back_to_creation_date() {
        let draft = map_movement(&movement(None), MovementCode::Hire, &assignment());
        assert_eq!(draft.date, "02/01/25");
    }

    #[test]
    fn payload_arguments_follow_procedure_order() {
        let payload = map_movement(
            &movement(NaiveDate::from_ymd_opt(2025, 1, 15)),
            MovementCode::SalaryChange,
            &assignment(),
        )
        .into_payload(778899, "0125")
        .unwrap();

        let args = payload.to_arguments();
        assert_eq!(args.len(), EDIT_ENTITY_ARITY);
        assert_eq!(
            args,
            vec![
                LegacyValue::Int(778899),
                LegacyValue::Text("01".into()),
                LegacyValue::Text("02".into()),
                LegacyValue::Text(String::new()),
                LegacyValue::Text(String::new()),
                LegacyValue::Float(15000.0),
                LegacyValue::Int(0),
                LegacyValue::Int(2),
                LegacyValue::Int(0),
                LegacyValue::Text("0125".into()),
                LegacyValue::Text("CS".into()),
                LegacyValue::Text("01/15/25".into()),
                LegacyValue::Text("C".into()),
                LegacyValue::Int(80),
            ]
        );
    }

    #[test]
    fn payload_serializes_with_legacy_names() {
        let payload = map_movement(
            &movement(NaiveDate::from_ymd_opt(2025, 1, 15)),
            MovementCode::SalaryChange,
            &assignment(),
        )
        .into_payload(778899, "0125")
        .unwrap();

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["interno"], 778899);
        assert_eq!(json["periodo"], "0125");
        assert_eq!(json["movimiento"], "CS");
        assert_eq!(json["bc"], "C");
        assert_eq!(json["porc"], 80);
    }

    #[test]
    fn payload_rejects_out_of_range_percentage() {
        let mut a = assignment();
        a.percentage = 59;
        let draft = map_movement(&movement(None), MovementCode::Hire, &a);
        assert!(draft.validate().is_err());
        assert_matches!(draft.into_payload(1, "0125"), Err(MigrationError::Validation(_)));
    }

    #[test]
    fn payload_rejects_unknown_base_confidence() {
        let mut a = assignment();
        a.base_confidence = "X".into();
        let draft = map_movement(&movement(None), MovementCode::Hire, &a);
        assert_matches!(draft.validate(), Err(MigrationError::Validation(_)));
    }
}
