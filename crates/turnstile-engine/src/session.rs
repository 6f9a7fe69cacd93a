//! User-facing [`Session`] API and shutdown sequence.
//!
//! A session owns the turn exchange and, in multiplayer, the background
//! sync thread that can drive it.
//!
//! # Architecture
//!
//! ```text
//! Simulation Thread                    Sync Thread (multiplayer only)
//!     |  (owns the exchange)               |
//!     |                                    | blocked on handoff gate
//!     |--scheduler().has_tick_elapsed()    |
//!     |--exchange()                        |
//!     |   send_pending_turns(turn, delta)  |
//!     |   receive_turns() -> hooks         |
//!     |                                    |
//!     |--release_to_sync()---------------->| gate opens
//!     |   (loading, waiting for players)   | lock exchange
//!     |                                    | send_pending_turns(0, 0)
//!     |                                    | receive_turns() -> hooks
//!     |                                    | unlock, park(next_tick - now)
//!     |--drop SyncRelease----------------->| gate closes after the
//!     |   (waits for in-flight cycle)      | in-flight cycle
//!     |                                    |
//!     |--stop(): flag, wake, unpark, join->| exits
//! ```
//!
//! Only one side drives the exchange at a time, so every tick the
//! exchange signals is seen exactly once by whoever polled for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};
use turnstile_core::{Clock, FatalError, SessionHooks, SystemClock, Transport};

use crate::config::{ConfigError, SessionConfig, SessionMode};
use crate::exchange::{RecvOutcome, TurnExchange};
use crate::metrics::{SyncCounters, SyncMetrics};
use crate::scheduler::TickScheduler;
use crate::sync_thread::{lock_exchange, Handoff, SyncThreadState};

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`Session::stop`].
#[derive(Debug)]
pub struct ShutdownReport {
    /// Total time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Whether the sync thread was joined successfully. `true` when there
    /// was no sync thread.
    pub thread_joined: bool,
    /// Fatal fault that halted the exchange, if any.
    pub fault: Option<FatalError>,
    /// Whether the transport reported the game as already over.
    pub game_destroyed: bool,
    /// Exchange counters at shutdown.
    pub metrics: SyncMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Running,
    Stopped,
}

// ── SyncRelease ──────────────────────────────────────────────────

/// The exchange is released to the sync thread while this is alive.
///
/// Dropping it (or calling [`reclaim`](Self::reclaim)) waits for the sync
/// thread to finish any in-flight cycle and hands the exchange back to
/// the simulation thread. The release borrows the session mutably, so
/// the simulation cannot touch the exchange or stop the session until
/// it has taken the exchange back.
pub struct SyncRelease<'a> {
    session: &'a mut Session,
}

impl SyncRelease<'_> {
    /// Take the exchange back for the simulation thread.
    pub fn reclaim(self) {}

    /// Snapshot of the exchange counters.
    pub fn metrics(&self) -> SyncMetrics {
        self.session.metrics()
    }

    /// Whether the sync thread is still alive.
    pub fn is_sync_running(&self) -> bool {
        self.session.is_sync_running()
    }

    /// Whether the transport reported the game as already over.
    pub fn is_game_destroyed(&self) -> bool {
        self.session.is_game_destroyed()
    }

    /// Fatal fault that halted the exchange, if any.
    pub fn fault(&self) -> Option<&FatalError> {
        self.session.fault()
    }
}

impl Drop for SyncRelease<'_> {
    fn drop(&mut self) {
        self.session.handoff.reclaim(&self.session.shared);
        debug!("exchange reclaimed from sync thread");
    }
}

// ── Session ──────────────────────────────────────────────────────

/// A running turn-synchronised session.
///
/// The simulation thread owns the exchange: it polls
/// [`poll_tick`](Self::poll_tick) (or locks [`exchange`](Self::exchange)
/// directly) whenever the scheduler reports a tick is due. In
/// [`SessionMode::Multiplayer`] a background thread named
/// `turnstile-sync` can take over pumping the exchange at the tick
/// cadence while the simulation is busy elsewhere; see
/// [`release_to_sync`](Self::release_to_sync).
pub struct Session {
    shared: Arc<Mutex<TurnExchange>>,
    handoff: Arc<Handoff>,
    scheduler: TickScheduler,
    mode: SessionMode,
    shutdown_flag: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    fault: Arc<OnceLock<FatalError>>,
    game_destroyed: Arc<AtomicBool>,
    counters: Arc<SyncCounters>,
    sync_thread: Option<JoinHandle<()>>,
    state: SessionState,
}

impl Session {
    /// Negotiate with the transport and start the session on the
    /// system clock.
    pub fn start(
        config: SessionConfig,
        transport: Box<dyn Transport>,
        hooks: Box<dyn SessionHooks>,
    ) -> Result<Self, ConfigError> {
        Self::start_with_clock(config, transport, hooks, Arc::new(SystemClock))
    }

    /// Like [`start`](Self::start), pacing against `clock`.
    pub fn start_with_clock(
        config: SessionConfig,
        transport: Box<dyn Transport>,
        hooks: Box<dyn SessionHooks>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let exchange = TurnExchange::start(&config, transport, hooks, Arc::clone(&clock))?;
        let pacing = *exchange.pacing();
        let fault = exchange.fault_handle();
        let scheduler = TickScheduler::new(
            &config,
            exchange.deadline_handle(),
            Arc::clone(&fault),
            clock,
        );
        let game_destroyed = exchange.game_destroyed_handle();
        let counters = exchange.counters_handle();
        let shared = Arc::new(Mutex::new(exchange));

        let handoff = Arc::new(Handoff::default());
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));

        let sync_thread = if config.mode.is_multiplayer() {
            let state = SyncThreadState::new(
                Arc::clone(&shared),
                Arc::clone(&handoff),
                Arc::clone(&shutdown_flag),
                Arc::clone(&stopped),
            );
            let handle = thread::Builder::new()
                .name("turnstile-sync".into())
                .spawn(move || state.run())
                .map_err(|e| ConfigError::ThreadSpawnFailed {
                    reason: e.to_string(),
                })?;
            Some(handle)
        } else {
            stopped.store(true, Ordering::Release);
            None
        };

        info!(
            mode = ?config.mode,
            tick_delay_ms = config.tick_delay_ms(),
            turns_in_transit = pacing.turns_in_transit_target,
            update_rate = pacing.update_rate_divisor,
            "session started"
        );

        Ok(Self {
            shared,
            handoff,
            scheduler,
            mode: config.mode,
            shutdown_flag,
            stopped,
            fault,
            game_destroyed,
            counters,
            sync_thread,
            state: SessionState::Running,
        })
    }

    /// Lock the exchange for the simulation thread.
    ///
    /// The guard gives direct access to the [`TurnExchange`] (and through
    /// it the transport). Locking twice on one thread deadlocks.
    pub fn exchange(&self) -> MutexGuard<'_, TurnExchange> {
        lock_exchange(&self.shared)
    }

    /// Run one simulation-thread tick poll.
    ///
    /// Reports [`RecvOutcome::IDLE`] until the scheduler says a tick is
    /// due, then polls the exchange, which advances the deadline when it
    /// signals the tick. Each due tick is therefore reported once. After
    /// a fatal fault every call returns that fault.
    pub fn poll_tick(&self) -> Result<RecvOutcome, FatalError> {
        if let Some(fault) = self.fault.get() {
            return Err(fault.clone());
        }
        if !self.scheduler.has_tick_elapsed() {
            return Ok(RecvOutcome::IDLE);
        }
        self.exchange().receive_turns()
    }

    /// Hand the exchange to the sync thread until the returned guard is
    /// dropped.
    ///
    /// In single-player there is no sync thread, so nothing drives the
    /// exchange while released.
    pub fn release_to_sync(&mut self) -> SyncRelease<'_> {
        self.handoff.release();
        debug!("exchange released to sync thread");
        SyncRelease { session: self }
    }

    /// Whether the simulation thread holds the exchange, keeping the sync
    /// thread idle. `true` except while a [`SyncRelease`] is alive.
    pub fn is_sync_paused(&self) -> bool {
        !self.handoff.is_released()
    }

    /// Whether the sync thread is alive. Always `false` in single-player.
    pub fn is_sync_running(&self) -> bool {
        self.sync_thread.is_some() && !self.stopped.load(Ordering::Acquire)
    }

    /// Whether the transport reported the game as already over.
    pub fn is_game_destroyed(&self) -> bool {
        self.game_destroyed.load(Ordering::Acquire)
    }

    /// Fatal fault that halted the exchange, if any.
    pub fn fault(&self) -> Option<&FatalError> {
        self.fault.get()
    }

    /// Snapshot of the exchange counters (lock-free).
    pub fn metrics(&self) -> SyncMetrics {
        self.counters.snapshot()
    }

    /// The tick scheduler for the simulation thread.
    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Local or networked play.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Stop the sync thread and report final state.
    ///
    /// Sets the shutdown flag, wakes the sync thread whether it waits on
    /// the handoff gate or a tick deadline, then joins it. Taking `&mut
    /// self` means any [`SyncRelease`] has already returned the exchange.
    /// Idempotent.
    pub fn stop(&mut self) -> ShutdownReport {
        if self.state == SessionState::Stopped {
            return ShutdownReport {
                total_ms: 0,
                thread_joined: true,
                fault: self.fault.get().cloned(),
                game_destroyed: self.is_game_destroyed(),
                metrics: self.metrics(),
            };
        }

        let start = Instant::now();
        self.state = SessionState::Stopped;
        self.shutdown_flag.store(true, Ordering::Release);
        self.handoff.wake();

        let thread_joined = match self.sync_thread.take() {
            Some(handle) => {
                handle.thread().unpark();
                match handle.join() {
                    Ok(()) => true,
                    Err(_) => {
                        warn!("sync thread panicked");
                        false
                    }
                }
            }
            None => true,
        };

        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            thread_joined,
            fault: self.fault.get().cloned(),
            game_destroyed: self.is_game_destroyed(),
            metrics: self.metrics(),
        };
        info!(
            total_ms = report.total_ms,
            thread_joined,
            faulted = report.fault.is_some(),
            turns_sent = report.metrics.turns_sent,
            receives = report.metrics.network_receives,
            "session stopped"
        );
        report
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state != SessionState::Stopped {
            self.stop();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("sync_running", &self.is_sync_running())
            .field("sync_paused", &self.is_sync_paused())
            .field("game_destroyed", &self.is_game_destroyed())
            .field("faulted", &self.fault.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use turnstile_core::{ProviderCaps, TransportErrorKind};
    use turnstile_test_utils::{ManualClock, RecordingHooks, ScriptedTransport};

    fn caps() -> ProviderCaps {
        ProviderCaps {
            default_turns_in_transit: 2,
            default_turns_per_sec: 20,
            max_message_size: 512,
            bytes_per_sec: 1_000_000,
            max_players: 2,
        }
    }

    fn single_player() -> (Session, ScriptedTransport, ManualClock) {
        let transport = ScriptedTransport::new(caps());
        let clock = ManualClock::new(500);
        let session = Session::start_with_clock(
            SessionConfig::new(SessionMode::SinglePlayer),
            Box::new(transport.clone()),
            Box::new(RecordingHooks::new()),
            Arc::new(clock.clone()),
        )
        .unwrap();
        (session, transport, clock)
    }

    #[test]
    fn single_player_has_no_thread() {
        let (session, _, _) = single_player();
        assert!(!session.is_sync_running());
        assert_eq!(session.mode(), SessionMode::SinglePlayer);
    }

    #[test]
    fn simulation_holds_exchange_until_released() {
        let (mut session, _, _) = single_player();
        assert!(session.is_sync_paused());
        let release = session.release_to_sync();
        assert!(!release.session.is_sync_paused());
        release.reclaim();
        assert!(session.is_sync_paused());
        {
            let _release = session.release_to_sync();
        }
        assert!(session.is_sync_paused());
    }

    #[test]
    fn simulation_thread_drives_single_player_exchange() {
        let (session, transport, clock) = single_player();
        {
            let mut ex = session.exchange();
            assert_eq!(ex.send_pending_turns(1, 1).unwrap(), 3);
            assert!(ex.receive_turns().unwrap().tick);
        }
        assert_eq!(transport.sent_turns().len(), 2);
        assert_eq!(session.metrics().network_receives, 1);
        // The receive advanced the deadline one tick past start.
        assert!(!session.scheduler().has_tick_elapsed());
        clock.advance(50);
        assert!(session.scheduler().has_tick_elapsed());
    }

    #[test]
    fn start_rejects_invalid_config() {
        let config = SessionConfig {
            tick_delay: Duration::ZERO,
            ..SessionConfig::default()
        };
        let err = Session::start(
            config,
            Box::new(ScriptedTransport::new(caps())),
            Box::new(RecordingHooks::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTickDelay { .. }));
    }

    #[test]
    fn start_surfaces_negotiation_failure() {
        let transport = ScriptedTransport::new(caps());
        transport.fail_caps(TransportErrorKind::NotInGame);
        let err = Session::start(
            SessionConfig::new(SessionMode::Multiplayer),
            Box::new(transport),
            Box::new(RecordingHooks::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Negotiation(_)));
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut session, _, _) = single_player();
        let first = session.stop();
        assert!(first.thread_joined);
        assert!(first.fault.is_none());
        let second = session.stop();
        assert_eq!(second.total_ms, 0);
        assert!(second.thread_joined);
    }

    #[test]
    fn destroyed_flag_visible_through_session() {
        let (session, transport, _) = single_player();
        transport.push_receive_error(TransportErrorKind::GameTerminated);
        session.exchange().receive_turns().unwrap();
        assert!(session.is_game_destroyed());
    }

    #[test]
    fn poll_tick_consumes_each_due_tick_once() {
        let (session, transport, clock) = single_player();
        assert!(session.poll_tick().unwrap().tick);
        assert_eq!(session.poll_tick().unwrap(), RecvOutcome::IDLE);
        clock.advance(49);
        assert_eq!(session.poll_tick().unwrap(), RecvOutcome::IDLE);
        clock.advance(1);
        assert!(session.poll_tick().unwrap().tick);
        assert_eq!(session.poll_tick().unwrap(), RecvOutcome::IDLE);
        let m = session.metrics();
        assert_eq!(m.cheap_polls + m.async_polls + m.network_receives, 2);
        assert_eq!(transport.receive_calls(), 1);
    }

    #[test]
    fn single_player_fault_halts_ticks() {
        let (mut session, transport, clock) = single_player();
        transport.push_receive_error(TransportErrorKind::Other(7));
        let fault = session.poll_tick().unwrap_err();
        assert_eq!(session.fault(), Some(&fault));
        assert!(session.scheduler().is_halted());
        for _ in 0..1_000 {
            clock.advance(50);
            assert!(!session.scheduler().has_tick_elapsed());
            assert_eq!(session.poll_tick().unwrap_err(), fault);
        }
        assert_eq!(transport.receive_calls(), 1);
        assert_eq!(session.stop().fault, Some(fault));
    }

    #[test]
    fn transport_reachable_through_exchange_guard() {
        let (session, transport, _) = single_player();
        {
            let mut ex = session.exchange();
            let t = ex.transport_mut();
            assert_eq!(t.turns_in_transit().unwrap(), 0);
            t.send_turn(&turnstile_core::TurnId::encode(9, false).to_bytes())
                .unwrap();
        }
        assert_eq!(
            transport.sent_turns(),
            vec![turnstile_core::TurnId::encode(9, false)]
        );
    }
}
