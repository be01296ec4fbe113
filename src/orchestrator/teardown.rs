//! Pending teardown queue
//!
//! Each run owns one by default. Handing the same queue to several
//! orchestrators shares teardown across them; enqueue and the drain swap
//! happen under the same lock, so no id is lost or executed twice.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct TeardownQueue {
    pending: Arc<Mutex<Vec<String>>>,
}

impl TeardownQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append ids, preserving order and duplicates
    pub fn register<I>(&self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.extend(ids);
        if pending.len() > before {
            debug!(queued = ?&pending[before..], "Registered teardown test cases");
        }
    }

    /// Swap the queued ids out, leaving the queue empty
    pub fn take_all(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
