//! The background sync loop for multiplayer sessions.
//!
//! The simulation thread owns the [`TurnExchange`] by default. The sync
//! thread sleeps on the [`Handoff`] gate until the simulation releases
//! the exchange to it. While released, each cycle takes the exchange
//! lock, tops up in-flight turns and polls for a tick, releases the lock,
//! then parks until the next tick is due. Parking (rather than
//! `thread::sleep`) lets
//! [`Session::stop`](crate::session::Session::stop) wake it immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};
use turnstile_core::Clock;

use crate::exchange::TurnExchange;

/// Lock the shared exchange, recovering from a poisoned mutex.
///
/// The exchange holds only counters and handles, so a panic on another
/// thread cannot leave it half-updated in a way later polls care about.
pub(crate) fn lock_exchange(shared: &Mutex<TurnExchange>) -> MutexGuard<'_, TurnExchange> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Handoff ──────────────────────────────────────────────────────

/// Who may drive the exchange: the simulation thread (the default) or
/// the sync thread.
///
/// Lock order is exchange, then gate. The sync thread never holds the
/// gate while taking the exchange lock.
#[derive(Default)]
pub(crate) struct Handoff {
    released: Mutex<bool>,
    changed: Condvar,
}

impl Handoff {
    fn gate(&self) -> MutexGuard<'_, bool> {
        self.released.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the sync thread may currently run cycles.
    pub fn is_released(&self) -> bool {
        *self.gate()
    }

    /// Let the sync thread drive the exchange.
    pub fn release(&self) {
        *self.gate() = true;
        self.changed.notify_all();
    }

    /// Take the exchange back for the simulation thread.
    ///
    /// Waits for any in-flight sync cycle, and closes the gate while
    /// holding the exchange lock so no later cycle can start.
    pub fn reclaim(&self, shared: &Mutex<TurnExchange>) {
        let _exchange = lock_exchange(shared);
        *self.gate() = false;
    }

    /// Wake a sync thread blocked on the gate so it can observe shutdown.
    pub fn wake(&self) {
        let _gate = self.gate();
        self.changed.notify_all();
    }

    /// Block until the gate opens or `shutdown` is raised. Returns
    /// `false` on shutdown.
    fn wait_released(&self, shutdown: &AtomicBool) -> bool {
        let mut released = self.gate();
        loop {
            if shutdown.load(Ordering::Acquire) {
                return false;
            }
            if *released {
                return true;
            }
            released = self
                .changed
                .wait(released)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

// ── SyncThreadState ──────────────────────────────────────────────

/// State held by the sync thread's main loop.
pub(crate) struct SyncThreadState {
    shared: Arc<Mutex<TurnExchange>>,
    handoff: Arc<Handoff>,
    shutdown_flag: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
    tick_delay_ms: i64,
}

impl SyncThreadState {
    pub fn new(
        shared: Arc<Mutex<TurnExchange>>,
        handoff: Arc<Handoff>,
        shutdown_flag: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
    ) -> Self {
        let (clock, tick_delay_ms) = {
            let exchange = lock_exchange(&shared);
            (Arc::clone(exchange.clock()), exchange.tick_delay_ms())
        };
        Self {
            shared,
            handoff,
            shutdown_flag,
            stopped,
            clock,
            tick_delay_ms,
        }
    }

    /// Main sync loop. Runs until `shutdown_flag` is set or a fatal
    /// transport fault occurs. The fault itself is latched by the
    /// exchange.
    pub fn run(self) {
        while self.handoff.wait_released(&self.shutdown_flag) {
            let wait_ms = {
                let mut exchange = lock_exchange(&self.shared);
                // Either may have changed while we waited on the lock.
                if self.shutdown_flag.load(Ordering::Acquire) {
                    break;
                }
                if !self.handoff.is_released() {
                    continue;
                }
                match exchange.pump() {
                    Ok(outcome) if outcome.tick => exchange.next_tick_at() - self.clock.now_millis(),
                    Ok(_) => self.tick_delay_ms,
                    Err(fault) => {
                        error!(%fault, "sync thread stopping on fatal fault");
                        break;
                    }
                }
            };

            self.park_for(wait_ms);
        }

        debug!("sync thread exiting");
        self.stopped.store(true, Ordering::Release);
    }

    /// Park until `wait_ms` has passed or shutdown is requested.
    /// Negative waits return immediately.
    fn park_for(&self, wait_ms: i64) {
        let Ok(ms) = u64::try_from(wait_ms) else {
            return;
        };
        let wake_at = Instant::now() + Duration::from_millis(ms);
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= wake_at {
                return;
            }
            thread::park_timeout(wake_at - now);
        }
    }
}
