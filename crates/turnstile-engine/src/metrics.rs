//! Turn-exchange counters for a running session.
//!
//! [`SyncCounters`] is shared between the exchange (writer, under the
//! session lock) and observers on other threads (lock-free readers).
//! [`SyncMetrics`] is a plain snapshot of those counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected over the life of a session.
///
/// All values are cumulative since session start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    /// Turn messages handed to the transport.
    pub turns_sent: u64,
    /// Polls answered from the packet countdown alone.
    pub cheap_polls: u64,
    /// Polls that rolled the sync countdown without a network read.
    pub async_polls: u64,
    /// Successful network receives.
    pub network_receives: u64,
    /// Receives that found nothing waiting (or hit an already-ended game).
    pub empty_receives: u64,
    /// Deadline realignments after an empty receive.
    pub realignments: u64,
    /// Transport errors swallowed as ignorable.
    pub ignored_errors: u64,
}

/// Atomic backing store for [`SyncMetrics`].
#[derive(Debug, Default)]
pub struct SyncCounters {
    turns_sent: AtomicU64,
    cheap_polls: AtomicU64,
    async_polls: AtomicU64,
    network_receives: AtomicU64,
    empty_receives: AtomicU64,
    realignments: AtomicU64,
    ignored_errors: AtomicU64,
}

impl SyncCounters {
    pub(crate) fn turn_sent(&self) {
        self.turns_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cheap_poll(&self) {
        self.cheap_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn async_poll(&self) {
        self.async_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn network_receive(&self) {
        self.network_receives.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn empty_receive(&self) {
        self.empty_receives.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn realignment(&self) {
        self.realignments.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn ignored_error(&self) {
        self.ignored_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> SyncMetrics {
        SyncMetrics {
            turns_sent: self.turns_sent.load(Ordering::Relaxed),
            cheap_polls: self.cheap_polls.load(Ordering::Relaxed),
            async_polls: self.async_polls.load(Ordering::Relaxed),
            network_receives: self.network_receives.load(Ordering::Relaxed),
            empty_receives: self.empty_receives.load(Ordering::Relaxed),
            realignments: self.realignments.load(Ordering::Relaxed),
            ignored_errors: self.ignored_errors.load(Ordering::Relaxed),
        }
    }
}
