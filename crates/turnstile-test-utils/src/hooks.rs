//! Hooks that record what the engine told them.

use std::sync::{Arc, Mutex, PoisonError};

use turnstile_core::{FatalError, SessionHooks, TurnBatch};

#[derive(Debug, Default)]
struct Recorded {
    batches: Vec<TurnBatch>,
    fatal: Vec<FatalError>,
}

/// [`SessionHooks`] that keep every batch and fault for later inspection.
///
/// Clones share the same record, so keep one clone in the test and move
/// the other into the session.
#[derive(Clone, Debug, Default)]
pub struct RecordingHooks {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches_received(&self) -> usize {
        self.record(|r| r.batches.len())
    }

    pub fn batches(&self) -> Vec<TurnBatch> {
        self.record(|r| r.batches.clone())
    }

    pub fn last_batch(&self) -> Option<TurnBatch> {
        self.record(|r| r.batches.last().cloned())
    }

    pub fn fatal_errors(&self) -> Vec<FatalError> {
        self.record(|r| r.fatal.clone())
    }

    fn record<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl SessionHooks for RecordingHooks {
    fn turns_received(&mut self, batch: &TurnBatch) {
        self.record(|r| r.batches.push(batch.clone()));
    }

    fn fatal(&mut self, error: &FatalError) {
        self.record(|r| r.fatal.push(error.clone()));
    }
}
