//! Stored-procedure calls with fault-classified retry.
//!
//! Every call goes through the gateway's FIFO queue under a time ceiling.
//! Failures are classified as timeout, write conflict or fatal:
//!
//! | Class    | Retries (default) | Delay before retry `n`       |
//! |----------|-------------------|------------------------------|
//! | timeout  | 1                 | `2000ms * n` + jitter        |
//! | conflict | 3                 | `1000ms * 2^(n-1)` + jitter  |
//! | fatal    | 0                 | -                            |
//!
//! A random jitter is also applied before the first attempt so callers
//! started together do not reach the legacy store in lockstep.

use std::sync::Arc;
use std::time::Duration;

use nomina_core::retry::{FaultClass, RetryPolicy};
use nomina_core::types::Interno;
use tokio::time::Instant;

use crate::driver::{DriverError, LegacyRow, LegacyValue};
use crate::error::LegacyError;
use crate::gateway::LegacyGateway;
use crate::statement;

/// Vendor codes for deadlock, lock conflict and update conflict.
const CONFLICT_CODES: &[i64] = &[335544336, 335544345, 335544451];

/// SQLSTATE for a serialization failure.
const CONFLICT_SQL_STATE: &str = "40001";

const CONFLICT_KEYWORDS: &[&str] = &["deadlock", "lock conflict", "update conflicts"];

/// Output parameter names of the legacy procedures.
pub const INTERNO_OUTPUT: &str = "INTERNO";
pub const ERROR_CODE_OUTPUT: &str = "CVE_ERROR";
pub const ERROR_MESSAGE_OUTPUT: &str = "MSG_ERROR";

/// Names of the two procedures the bridge calls.
#[derive(Debug, Clone)]
pub struct ProcedureNames {
    pub create_affiliate: String,
    pub edit_entity: String,
}

impl Default for ProcedureNames {
    fn default() -> Self {
        Self {
            create_affiliate: "SP_ALTA_AFILIADO".to_string(),
            edit_entity: "SP_EDITA_ENTIDAD".to_string(),
        }
    }
}

/// Successful procedure call.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Output parameters, returned verbatim.
    pub row: LegacyRow,
    /// Retries consumed across all fault classes.
    pub retry_count: u32,
    pub elapsed: Duration,
}

impl Invocation {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// Result of the "create affiliate" procedure.
#[derive(Debug, Clone)]
pub struct CreateAffiliateOutcome {
    /// `0` (or negative) means the legacy store refused the record.
    pub interno: Interno,
    pub retry_count: u32,
    pub elapsed_ms: u64,
}

/// Result of the "edit entity" procedure.
#[derive(Debug, Clone)]
pub struct EditEntityOutcome {
    pub error_code: i64,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub elapsed_ms: u64,
}

/// Decide how a driver failure is retried.
pub fn classify_driver_error(error: &DriverError) -> FaultClass {
    if error.code.is_some_and(|c| CONFLICT_CODES.contains(&c)) {
        return FaultClass::Conflict;
    }
    if error.sql_state.as_deref() == Some(CONFLICT_SQL_STATE) {
        return FaultClass::Conflict;
    }
    let message = error.message.to_lowercase();
    if CONFLICT_KEYWORDS.iter().any(|k| message.contains(k)) {
        return FaultClass::Conflict;
    }
    FaultClass::Fatal
}

enum Failure {
    Timeout,
    Conflict(DriverError),
}

/// Calls legacy stored procedures through a [`LegacyGateway`].
#[derive(Clone)]
pub struct ProcedureInvoker {
    gateway: Arc<LegacyGateway>,
    policy: RetryPolicy,
    names: ProcedureNames,
}

impl ProcedureInvoker {
    pub fn new(gateway: Arc<LegacyGateway>, policy: RetryPolicy, names: ProcedureNames) -> Self {
        Self {
            gateway,
            policy,
            names,
        }
    }

    pub fn gateway(&self) -> &Arc<LegacyGateway> {
        &self.gateway
    }

    pub fn names(&self) -> &ProcedureNames {
        &self.names
    }

    /// Execute `procedure` with positional `params`, retrying per policy.
    ///
    /// Connects lazily. Connectivity failures are never retried here.
    pub async fn invoke(
        &self,
        procedure: &str,
        params: Vec<LegacyValue>,
    ) -> Result<Invocation, LegacyError> {
        let started = Instant::now();
        self.gateway.connect().await?;

        let sql = statement::procedure_call(procedure, params.len());
        let params = Arc::new(params);
        let mut timeout_retries = 0u32;
        let mut conflict_retries = 0u32;

        tokio::time::sleep(self.policy.jitter()).await;

        loop {
            let attempt = timeout_retries + conflict_retries + 1;
            let call = {
                let sql = sql.clone();
                let params = Arc::clone(&params);
                self.gateway
                    .run_exclusive(move |conn| async move { conn.query(&sql, &params).await })
            };

            let failure = match tokio::time::timeout(self.policy.call_timeout, call).await {
                Ok(Ok(rows)) => {
                    let retry_count = timeout_retries + conflict_retries;
                    tracing::debug!(procedure, attempt, retry_count, "Procedure call succeeded");
                    return Ok(Invocation {
                        row: rows.into_iter().next().unwrap_or_default(),
                        retry_count,
                        elapsed: started.elapsed(),
                    });
                }
                Ok(Err(LegacyError::Driver(e))) => match classify_driver_error(&e) {
                    FaultClass::Conflict => Failure::Conflict(e),
                    _ => {
                        tracing::error!(procedure, attempt, error = %e, code = ?e.code, "Procedure call failed");
                        return Err(LegacyError::Driver(e));
                    }
                },
                Ok(Err(other)) => return Err(other),
                Err(_) => Failure::Timeout,
            };

            let (class, retries) = match &failure {
                Failure::Timeout => (FaultClass::Timeout, &mut timeout_retries),
                Failure::Conflict(_) => (FaultClass::Conflict, &mut conflict_retries),
            };

            if *retries >= self.policy.max_retries(class) {
                tracing::error!(procedure, attempts = attempt, class = %class, "Procedure call retries exhausted");
                return Err(match failure {
                    Failure::Timeout => LegacyError::Timeout {
                        procedure: procedure.to_string(),
                        attempts: attempt,
                    },
                    Failure::Conflict(source) => LegacyError::Conflict {
                        procedure: procedure.to_string(),
                        attempts: attempt,
                        source,
                    },
                });
            }

            *retries += 1;
            let delay = self.policy.backoff(class, *retries);
            match &failure {
                Failure::Timeout => tracing::warn!(
                    procedure,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Procedure call timed out, retrying",
                ),
                Failure::Conflict(e) => tracing::warn!(
                    procedure,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Write conflict, retrying",
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Create the legacy affiliate record and return its identity.
    pub async fn create_affiliate(
        &self,
        params: Vec<LegacyValue>,
    ) -> Result<CreateAffiliateOutcome, LegacyError> {
        let procedure = &self.names.create_affiliate;
        let invocation = self.invoke(procedure, params).await?;
        let interno = invocation
            .row
            .get_i64(INTERNO_OUTPUT)
            .ok_or_else(|| LegacyError::MissingOutput {
                procedure: procedure.clone(),
                column: INTERNO_OUTPUT.to_string(),
            })?;

        Ok(CreateAffiliateOutcome {
            interno: Interno::try_from(interno).unwrap_or(0),
            retry_count: invocation.retry_count,
            elapsed_ms: invocation.elapsed_ms(),
        })
    }

    /// Apply a movement to the legacy store.
    pub async fn edit_entity(
        &self,
        params: Vec<LegacyValue>,
    ) -> Result<EditEntityOutcome, LegacyError> {
        let procedure = &self.names.edit_entity;
        let invocation = self.invoke(procedure, params).await?;
        let error_code = invocation
            .row
            .get_i64(ERROR_CODE_OUTPUT)
            .ok_or_else(|| LegacyError::MissingOutput {
                procedure: procedure.clone(),
                column: ERROR_CODE_OUTPUT.to_string(),
            })?;
        let error_message = self
            .gateway
            .message(&invocation.row, ERROR_MESSAGE_OUTPUT)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(EditEntityOutcome {
            error_code,
            error_message,
            retry_count: invocation.retry_count,
            elapsed_ms: invocation.elapsed_ms(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
