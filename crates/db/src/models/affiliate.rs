//! Affiliate (person) model.

use chrono::NaiveDate;
use nomina_core::types::{DbId, Interno, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `afiliados` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Affiliate {
    pub id: DbId,
    /// National ID (CURP).
    pub curp: Option<String>,
    /// Tax ID (RFC).
    pub rfc: Option<String>,
    pub employee_number: Option<String>,
    pub first_name: Option<String>,
    pub paternal_surname: Option<String>,
    pub maternal_surname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Social-security number (NSS).
    pub nss: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub marital_status: Option<String>,
    pub admission_at: Option<Timestamp>,
    pub dependents: Option<i32>,
    pub owns_property: Option<bool>,
    pub email: Option<String>,
    pub nationality: Option<String>,
    /// Legacy identity. Never reset once positive.
    pub interno: Option<Interno>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Affiliate {
    /// The legacy identity if one has been assigned.
    pub fn legacy_identity(&self) -> Option<Interno> {
        self.interno.filter(|i| *i > 0)
    }
}

/// DTO for inserting an affiliate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAffiliate {
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub employee_number: Option<String>,
    pub first_name: Option<String>,
    pub paternal_surname: Option<String>,
    pub maternal_surname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nss: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub marital_status: Option<String>,
    pub admission_at: Option<Timestamp>,
    pub dependents: Option<i32>,
    pub owns_property: Option<bool>,
    pub email: Option<String>,
    pub nationality: Option<String>,
    pub interno: Option<Interno>,
}
