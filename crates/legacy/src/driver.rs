//! The seam between the bridge and the vendor's legacy database client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A positional parameter or a column value exchanged with the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LegacyValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    /// Undecoded CHAR/VARCHAR bytes, as returned for `NONE` charset columns.
    Bytes(Vec<u8>),
}

impl LegacyValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i32> for LegacyValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for LegacyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for LegacyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for LegacyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for LegacyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<char> for LegacyValue {
    fn from(v: char) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<LegacyValue>> From<Option<T>> for LegacyValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One result row: column names paired with values, in driver order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegacyRow {
    pub columns: Vec<(String, LegacyValue)>,
}

impl LegacyRow {
    pub fn new(columns: Vec<(String, LegacyValue)>) -> Self {
        Self { columns }
    }

    /// Value of a column, matched case-insensitively.
    pub fn get(&self, column: &str) -> Option<&LegacyValue> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(LegacyValue::as_i64)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Where a driver failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverErrorKind {
    /// Attaching to the database or the liveness probe failed.
    Connection,
    /// A statement failed on an established connection.
    Statement,
}

/// A failure reported by the legacy driver.
///
/// Cloneable so one connection failure can be handed to every caller
/// waiting on the same attempt.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    /// Vendor error code (GDS code), when the driver reports one.
    pub code: Option<i64>,
    pub sql_state: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Connection,
            code: None,
            sql_state: None,
            message: message.into(),
        }
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Statement,
            code: None,
            sql_state: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Opens connections to the legacy database.
#[async_trait]
pub trait LegacyConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Arc<dyn LegacyConnection>, DriverError>;
}

/// An open legacy connection. Not safe for concurrent use: callers go
/// through [`crate::LegacyGateway`], never directly.
#[async_trait]
pub trait LegacyConnection: Send + Sync + 'static {
    /// Run a statement with positional `?` parameters and collect its rows.
    /// `EXECUTE PROCEDURE` yields a single row of output parameters.
    async fn query(&self, sql: &str, params: &[LegacyValue]) -> Result<Vec<LegacyRow>, DriverError>;

    /// Detach from the database.
    async fn close(&self) -> Result<(), DriverError>;
}
