//! Scripted in-memory driver for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::driver::{DriverError, LegacyConnection, LegacyConnector, LegacyRow, LegacyValue};
use crate::statement::PROBE_SQL;

/// One scripted response to a non-probe statement.
pub(crate) enum Reply {
    Rows(Vec<LegacyRow>),
    Fail(DriverError),
    /// Wait, then answer with the inner reply.
    After(Duration, Box<Reply>),
}

impl Reply {
    pub(crate) fn row(columns: &[(&str, LegacyValue)]) -> Self {
        Self::Rows(vec![LegacyRow::new(
            columns
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        )])
    }
}

#[derive(Default)]
pub(crate) struct FakeConnection {
    replies: Mutex<VecDeque<Reply>>,
    pub(crate) calls: Mutex<Vec<(String, Vec<LegacyValue>)>>,
    pub(crate) call_times: Mutex<Vec<Instant>>,
    pub(crate) probe_error: Mutex<Option<DriverError>>,
    pub(crate) closed: AtomicBool,
}

impl FakeConnection {
    pub(crate) fn script(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LegacyConnection for FakeConnection {
    async fn query(&self, sql: &str, params: &[LegacyValue]) -> Result<Vec<LegacyRow>, DriverError> {
        if sql == PROBE_SQL {
            if let Some(e) = self.probe_error.lock().unwrap().clone() {
                return Err(e);
            }
            return Ok(vec![LegacyRow::new(vec![("CONSTANT".into(), LegacyValue::Int(1))])]);
        }

        self.calls.lock().unwrap().push((sql.to_string(), params.to_vec()));
        self.call_times.lock().unwrap().push(Instant::now());

        let mut reply = self.replies.lock().unwrap().pop_front();
        loop {
            match reply {
                None => return Ok(Vec::new()),
                Some(Reply::Rows(rows)) => return Ok(rows),
                Some(Reply::Fail(e)) => return Err(e),
                Some(Reply::After(delay, inner)) => {
                    tokio::time::sleep(delay).await;
                    reply = Some(*inner);
                }
            }
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct FakeConnector {
    pub(crate) connection: Arc<FakeConnection>,
    pub(crate) connects: AtomicUsize,
    pub(crate) connect_delay: Duration,
    pub(crate) failures: Mutex<VecDeque<DriverError>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub(crate) fn with_delay(connect_delay: Duration) -> Self {
        Self {
            connection: Arc::new(FakeConnection::default()),
            connects: AtomicUsize::new(0),
            connect_delay,
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn fail_next(&self, error: DriverError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LegacyConnector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn LegacyConnection>, DriverError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.connect_delay).await;
        if let Some(e) = self.failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(Arc::clone(&self.connection) as Arc<dyn LegacyConnection>)
    }
}
