//! Single entry point for everything that touches the legacy database.

use std::future::Future;
use std::sync::Arc;

use nomina_core::encoding::{EncodingCorrector, RawValue};
use nomina_core::types::Interno;

use crate::connection::ConnectionManager;
use crate::driver::{
    DriverError, DriverErrorKind, LegacyConnection, LegacyConnector, LegacyRow, LegacyValue,
};
use crate::error::LegacyError;
use crate::serializer::AccessSerializer;
use crate::statement::LOOKUP_INTERNO_SQL;

/// Connection lifecycle, serialized access and text decoding for the
/// legacy database.
pub struct LegacyGateway {
    connections: ConnectionManager,
    serializer: AccessSerializer,
    corrector: EncodingCorrector,
}

impl LegacyGateway {
    pub fn new(connector: Arc<dyn LegacyConnector>, corrector: EncodingCorrector) -> Self {
        Self {
            connections: ConnectionManager::new(connector),
            serializer: AccessSerializer::new(),
            corrector,
        }
    }

    /// Ensure a live connection exists.
    pub async fn connect(&self) -> Result<(), LegacyError> {
        self.connections
            .connect()
            .await
            .map(|_| ())
            .map_err(LegacyError::Connect)
    }

    pub async fn disconnect(&self) {
        self.connections.disconnect().await;
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    pub fn corrector(&self) -> &EncodingCorrector {
        &self.corrector
    }

    /// Run `op` against the live connection once every earlier operation
    /// has finished.
    ///
    /// Fails fast with [`LegacyError::Unavailable`] when there is no live
    /// connection at submission, and again if it went away while queued.
    /// A connection-level driver failure drops the cached handle and is
    /// reported as [`LegacyError::Connect`]; the next connect reopens it.
    pub async fn run_exclusive<F, Fut, T>(&self, op: F) -> Result<T, LegacyError>
    where
        F: FnOnce(Arc<dyn LegacyConnection>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DriverError>> + Send + 'static,
        T: Send + 'static,
    {
        if !self.connections.is_connected() {
            return Err(LegacyError::Unavailable);
        }

        let connections = self.connections.clone();
        self.serializer
            .run_exclusive(move || async move {
                let conn = connections.current().ok_or(LegacyError::Unavailable)?;
                match op(Arc::clone(&conn)).await {
                    Ok(value) => Ok(value),
                    Err(e) if e.kind == DriverErrorKind::Connection => {
                        connections.invalidate(&conn).await;
                        Err(LegacyError::Connect(e))
                    }
                    Err(e) => Err(LegacyError::Driver(e)),
                }
            })
            .await?
    }

    /// Run a statement through the queue and collect its rows.
    pub async fn query(
        &self,
        sql: impl Into<String>,
        params: Vec<LegacyValue>,
    ) -> Result<Vec<LegacyRow>, LegacyError> {
        let sql = sql.into();
        self.run_exclusive(move |conn| async move { conn.query(&sql, &params).await })
            .await
    }

    /// Find an existing legacy identity by CURP or RFC.
    ///
    /// Returns `None` when neither key is given or nothing matches.
    pub async fn lookup_interno(
        &self,
        curp: Option<&str>,
        rfc: Option<&str>,
    ) -> Result<Option<Interno>, LegacyError> {
        let curp = curp.map(str::trim).filter(|s| !s.is_empty());
        let rfc = rfc.map(str::trim).filter(|s| !s.is_empty());
        if curp.is_none() && rfc.is_none() {
            return Ok(None);
        }

        let rows = self
            .query(LOOKUP_INTERNO_SQL, vec![curp.into(), rfc.into()])
            .await?;
        let interno = rows
            .first()
            .and_then(|row| row.get_i64("INTERNO"))
            .and_then(|v| Interno::try_from(v).ok())
            .filter(|v| *v > 0);

        tracing::debug!(?interno, "Legacy identity lookup");
        Ok(interno)
    }

    /// Decoded, repaired free text of `column` (messages, diagnostics), or
    /// `None` when absent or NULL.
    pub fn message(&self, row: &LegacyRow, column: &str) -> Option<String> {
        let raw = match row.get(column)? {
            LegacyValue::Null => return None,
            LegacyValue::Text(s) => RawValue::from(s.as_str()),
            LegacyValue::Bytes(b) => RawValue::from(b.as_slice()),
            LegacyValue::Int(i) => return Some(i.to_string()),
            LegacyValue::Float(f) => return Some(f.to_string()),
        };
        Some(self.corrector.decode(raw, None))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
