//! Lazily established, cached legacy connection.
//!
//! The first caller of [`ConnectionManager::connect`] starts a connection
//! attempt; callers arriving while it is in flight wait on the same
//! attempt and all receive its outcome. A new connection is checked with
//! a liveness probe before it is handed out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::driver::{DriverError, LegacyConnection, LegacyConnector};
use crate::statement::PROBE_SQL;

type Waiter = oneshot::Sender<Result<Arc<dyn LegacyConnection>, DriverError>>;

enum State {
    Disconnected,
    Connecting(Vec<Waiter>),
    Connected(Arc<dyn LegacyConnection>),
}

struct Shared {
    state: State,
    /// Bumped by every new attempt and every disconnect. An attempt whose
    /// generation is stale on completion discards its connection.
    generation: u64,
}

/// Owns the single legacy connection handle.
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn LegacyConnector>,
    shared: Arc<Mutex<Shared>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn LegacyConnector>) -> Self {
        Self {
            connector,
            shared: Arc::new(Mutex::new(Shared {
                state: State::Disconnected,
                generation: 0,
            })),
        }
    }

    /// Return the live connection, establishing it first if needed.
    ///
    /// At most one attempt is in flight at a time. When it fails, every
    /// waiter receives the failure and the manager returns to
    /// disconnected so a later call can try again.
    pub async fn connect(&self) -> Result<Arc<dyn LegacyConnection>, DriverError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut shared = lock(&self.shared);
            let initiator = match &mut shared.state {
                State::Connected(conn) => return Ok(Arc::clone(conn)),
                State::Connecting(waiters) => {
                    waiters.push(tx);
                    None
                }
                State::Disconnected => Some(tx),
            };
            if let Some(tx) = initiator {
                shared.generation += 1;
                shared.state = State::Connecting(vec![tx]);
                self.spawn_attempt(shared.generation);
            }
        }

        rx.await
            .unwrap_or_else(|_| Err(DriverError::connection("Connection attempt abandoned")))
    }

    fn spawn_attempt(&self, generation: u64) {
        let connector = Arc::clone(&self.connector);
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            tracing::info!(generation, "Connecting to legacy database");
            let result = establish(connector.as_ref()).await;

            let waiters = {
                let mut guard = lock(&shared);
                if guard.generation != generation {
                    None
                } else {
                    let next = match &result {
                        Ok(conn) => State::Connected(Arc::clone(conn)),
                        Err(_) => State::Disconnected,
                    };
                    match std::mem::replace(&mut guard.state, next) {
                        State::Connecting(waiters) => Some(waiters),
                        _ => Some(Vec::new()),
                    }
                }
            };

            let Some(waiters) = waiters else {
                // Disconnected while the attempt was in flight.
                tracing::info!(generation, "Discarding superseded legacy connection attempt");
                if let Ok(conn) = result {
                    if let Err(e) = conn.close().await {
                        tracing::warn!(error = %e, "Failed to close superseded legacy connection");
                    }
                }
                return;
            };

            match &result {
                Ok(_) => tracing::info!(generation, waiters = waiters.len(), "Legacy connection established"),
                Err(e) => tracing::error!(
                    generation,
                    waiters = waiters.len(),
                    error = %e,
                    "Legacy connection failed",
                ),
            }
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        });
    }

    /// The live connection, if any. Never starts an attempt.
    pub fn current(&self) -> Option<Arc<dyn LegacyConnection>> {
        match &lock(&self.shared).state {
            State::Connected(conn) => Some(Arc::clone(conn)),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(lock(&self.shared).state, State::Connected(_))
    }

    /// Drop `conn` if it is still the cached handle, so the next
    /// [`connect`](Self::connect) opens a fresh one. A handle that was
    /// already replaced or disconnected is left alone.
    pub async fn invalidate(&self, conn: &Arc<dyn LegacyConnection>) -> bool {
        let stale = {
            let mut shared = lock(&self.shared);
            let is_current = matches!(
                &shared.state,
                State::Connected(cached) if std::ptr::addr_eq(Arc::as_ptr(cached), Arc::as_ptr(conn))
            );
            if !is_current {
                return false;
            }
            shared.generation += 1;
            std::mem::replace(&mut shared.state, State::Disconnected)
        };

        tracing::warn!("Legacy connection lost, dropping cached handle");
        if let State::Connected(conn) = stale {
            if let Err(e) = conn.close().await {
                tracing::warn!(error = %e, "Error while closing lost legacy connection");
            }
        }
        true
    }

    /// Close the live connection (if any) and reset to disconnected.
    ///
    /// Callers waiting on an in-flight attempt receive a connection
    /// failure; the attempt's handle is closed when it arrives.
    pub async fn disconnect(&self) {
        let previous = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            std::mem::replace(&mut shared.state, State::Disconnected)
        };

        match previous {
            State::Connected(conn) => {
                if let Err(e) = conn.close().await {
                    tracing::warn!(error = %e, "Error while closing legacy connection");
                }
                tracing::info!("Legacy connection closed");
            }
            State::Connecting(waiters) => {
                for waiter in waiters {
                    let _ = waiter.send(Err(DriverError::connection(
                        "Disconnected while connecting",
                    )));
                }
            }
            State::Disconnected => {}
        }
    }
}

/// Open a connection and verify it answers the probe.
async fn establish(connector: &dyn LegacyConnector) -> Result<Arc<dyn LegacyConnection>, DriverError> {
    let conn = connector.connect().await?;
    if let Err(e) = conn.query(PROBE_SQL, &[]).await {
        let _ = conn.close().await;
        return Err(DriverError::connection(format!("Liveness probe failed: {}", e.message)));
    }
    Ok(conn)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
