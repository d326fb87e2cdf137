//! FIFO access queue for the legacy connection.
//!
//! Every operation that touches the legacy connection runs through
//! [`AccessSerializer::run_exclusive`]. Operations execute one at a time,
//! in the order they were submitted. A failed or panicked operation does
//! not block its successors.
//!
//! Each submission swaps itself in as the new tail of the queue before
//! anything is awaited, then runs on a spawned task that first waits for
//! its predecessor. The caller only awaits the result, so dropping the
//! caller (or timing it out) never cancels an operation already handed
//! to the driver; the next operation still waits for it to finish.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::LegacyError;

/// Serializes access to a single non-reentrant resource.
pub struct AccessSerializer {
    /// Completion signal of the most recently submitted operation.
    tail: Mutex<oneshot::Receiver<()>>,
    submitted: AtomicU64,
}

impl AccessSerializer {
    pub fn new() -> Self {
        let (done, tail) = oneshot::channel();
        let _ = done.send(());
        Self {
            tail: Mutex::new(tail),
            submitted: AtomicU64::new(0),
        }
    }

    /// Number of operations submitted so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Run `op` after every previously submitted operation has completed.
    ///
    /// Returns [`LegacyError::Aborted`] only if `op` panicked.
    pub async fn run_exclusive<F, Fut, T>(&self, op: F) -> Result<T, LegacyError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let (previous, ticket) = {
            let mut tail = lock(&self.tail);
            let ticket = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
            (std::mem::replace(&mut *tail, done_rx), ticket)
        };

        let (result_tx, result_rx) = oneshot::channel();
        tokio::spawn(async move {
            // Only completion matters; a predecessor that panicked drops its sender.
            let _ = previous.await;
            tracing::trace!(ticket, "Dispatching exclusive legacy operation");
            let output = op().await;
            let _ = result_tx.send(output);
            let _ = done_tx.send(());
        });

        result_rx.await.map_err(|_| LegacyError::Aborted)
    }
}

impl Default for AccessSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
