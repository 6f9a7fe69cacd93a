//! The turn-exchange protocol: outbound turn submission, inbound turn
//! reception, and the two-tier countdown that paces network reads.
//!
//! Most polls never touch the network. `packet` counts down ticks inside
//! one update-rate period; each time it runs out, `sync` counts down one
//! period. Only when `sync` also reaches zero does the exchange perform a
//! real receive, after which `sync` is refilled to the resync window. An
//! empty receive drops both counters to 1 so the next poll retries
//! immediately, and marks the session out of sync so the first successful
//! receive afterwards realigns the tick deadline to "now".
//!
//! # Error policy
//!
//! | Class | Send path | Receive path |
//! |-------|-----------|--------------|
//! | Ignorable (invalid player) | stop sending this cycle | reset counters, no tick |
//! | Already terminated | mark game destroyed, stop sending | mark destroyed, reset, no tick |
//! | Transient (no messages) | fatal | reset counters, no tick |
//! | Fatal | hook + `Err` | hook + `Err` |
//!
//! The first fatal fault is latched. Every later send or receive returns
//! that same fault without touching the transport, and the hook is not
//! called again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info, trace, warn};
use turnstile_core::{
    advance_counter, Clock, EpochLatch, ErrorClass, FatalError, SessionHooks, TickDeadline,
    Transport, TransportError, TurnId, MAX_PLAYERS,
};

use crate::config::{ConfigError, SessionConfig};
use crate::metrics::{SyncCounters, SyncMetrics};
use crate::pacing::PacingParams;

/// Result of one [`TurnExchange::receive_turns`] poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvOutcome {
    /// A simulation tick is due.
    pub tick: bool,
    /// Recipients should be notified asynchronously this tick.
    pub send_async: bool,
}

impl RecvOutcome {
    /// No tick this poll.
    pub const IDLE: Self = Self {
        tick: false,
        send_async: false,
    };
}

/// Countdown state driving network reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdowns {
    /// Ticks left in the current update-rate period.
    pub packet: u32,
    /// Periods left before the next network receive.
    pub sync: u32,
    /// The last receive came back empty; realign on the next success.
    pub out_of_sync: bool,
}

impl Countdowns {
    /// State at session start and after an empty receive: read next poll.
    pub const RETRY: Self = Self {
        packet: 1,
        sync: 1,
        out_of_sync: false,
    };
}

/// Per-session turn-exchange state.
///
/// Owns the transport and the simulation hooks. Shared with the sync
/// thread behind the session mutex; the tick deadline, game-destroyed
/// flag, fault slot, and counters are also exposed as `Arc` handles so
/// other threads can read them without the lock.
pub struct TurnExchange {
    transport: Box<dyn Transport>,
    hooks: Box<dyn SessionHooks>,
    clock: Arc<dyn Clock>,
    pacing: PacingParams,
    tick_delay_ms: i64,
    resync_window: u32,
    countdowns: Countdowns,
    epoch: EpochLatch,
    deadline: Arc<TickDeadline>,
    game_destroyed: Arc<AtomicBool>,
    fault: Arc<OnceLock<FatalError>>,
    counters: Arc<SyncCounters>,
}

impl TurnExchange {
    /// Validate `config`, negotiate pacing with the transport, and set up
    /// fresh countdown state with the tick deadline at "now".
    pub fn start(
        config: &SessionConfig,
        mut transport: Box<dyn Transport>,
        hooks: Box<dyn SessionHooks>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pacing = PacingParams::negotiate(transport.as_mut(), &config.pacing)?;
        let now = clock.now_millis();
        Ok(Self {
            transport,
            hooks,
            clock,
            pacing,
            tick_delay_ms: config.tick_delay_ms(),
            resync_window: config.resync_window,
            countdowns: Countdowns::RETRY,
            epoch: EpochLatch::new(config.consume_epoch_bit),
            deadline: Arc::new(TickDeadline::new(now)),
            game_destroyed: Arc::new(AtomicBool::new(false)),
            fault: Arc::new(OnceLock::new()),
            counters: Arc::new(SyncCounters::default()),
        })
    }

    /// Top up this peer's in-flight turns to the negotiated target.
    ///
    /// Sends one message per missing slot, starting at `current_turn` and
    /// stepping by `turn_delta` with wraparound. The first turn sent after
    /// the epoch latch is armed carries the epoch bit. Returns the counter
    /// following the last turn sent.
    pub fn send_pending_turns(
        &mut self,
        current_turn: u32,
        turn_delta: u32,
    ) -> Result<u32, FatalError> {
        self.ensure_live()?;
        let mut turn = current_turn;
        let mut in_transit = match self.transport.turns_in_transit() {
            Ok(n) => n,
            Err(err) => {
                self.absorb_send_failure("turns_in_transit", err)?;
                return Ok(turn);
            }
        };

        while in_transit < self.pacing.turns_in_transit_target {
            let id = TurnId::encode(turn, self.epoch.take());
            if let Err(err) = self.transport.send_turn(&id.to_bytes()) {
                self.absorb_send_failure("send_turn", err)?;
                return Ok(turn);
            }
            self.counters.turn_sent();
            trace!(turn = %id, "sent turn");
            turn = advance_counter(turn, turn_delta);
            in_transit += 1;
        }
        Ok(turn)
    }

    /// Poll for the next tick, reading from the network only when the
    /// countdowns run out.
    pub fn receive_turns(&mut self) -> Result<RecvOutcome, FatalError> {
        self.ensure_live()?;
        self.countdowns.packet = self.countdowns.packet.saturating_sub(1);
        if self.countdowns.packet > 0 {
            self.counters.cheap_poll();
            return Ok(self.signal_tick(false));
        }

        self.countdowns.sync = self.countdowns.sync.saturating_sub(1);
        self.countdowns.packet = self.pacing.update_rate_divisor;
        if self.countdowns.sync != 0 {
            self.counters.async_poll();
            return Ok(self.signal_tick(true));
        }

        let batch = match self.transport.receive_turns(MAX_PLAYERS) {
            Ok(batch) => batch,
            Err(err) => {
                self.absorb_receive_failure(err)?;
                self.counters.empty_receive();
                self.countdowns = Countdowns {
                    out_of_sync: true,
                    ..Countdowns::RETRY
                };
                return Ok(RecvOutcome::IDLE);
            }
        };

        if self.countdowns.out_of_sync {
            self.countdowns.out_of_sync = false;
            let now = self.clock.now_millis();
            self.deadline.set(now);
            self.counters.realignment();
            warn!(now, "turns resumed, realigning tick deadline");
        }
        self.countdowns.sync = self.resync_window;
        self.counters.network_receive();
        trace!(
            players = batch.present_count(),
            bytes = batch.total_bytes(),
            "received turn batch"
        );
        self.hooks.turns_received(&batch);
        Ok(self.signal_tick(true))
    }

    /// One sync-thread cycle: top up in-flight turns with the padding turn
    /// (counter 0, delta 0), then poll for a tick.
    pub fn pump(&mut self) -> Result<RecvOutcome, FatalError> {
        self.send_pending_turns(0, 0)?;
        self.receive_turns()
    }

    /// Arm the epoch latch so the next turn sent carries the epoch bit.
    pub fn arm_epoch_bit(&mut self) {
        self.epoch.arm();
    }

    /// Whether the next turn sent would carry the epoch bit.
    pub fn epoch_bit_armed(&self) -> bool {
        self.epoch.is_armed()
    }

    /// Negotiated pacing for this session.
    pub fn pacing(&self) -> &PacingParams {
        &self.pacing
    }

    /// Current countdown state.
    pub fn countdowns(&self) -> Countdowns {
        self.countdowns
    }

    /// Fixed tick delay in milliseconds.
    pub fn tick_delay_ms(&self) -> i64 {
        self.tick_delay_ms
    }

    /// Timestamp (ms) at which the next tick is due.
    pub fn next_tick_at(&self) -> i64 {
        self.deadline.get()
    }

    /// The clock this exchange paces against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Whether the transport reported the game as already over.
    pub fn is_game_destroyed(&self) -> bool {
        self.game_destroyed.load(Ordering::Acquire)
    }

    /// The fatal fault that halted this exchange, if any.
    pub fn fault(&self) -> Option<&FatalError> {
        self.fault.get()
    }

    /// Direct transport access for callers holding the session lock.
    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    /// Snapshot of the exchange counters.
    pub fn metrics(&self) -> SyncMetrics {
        self.counters.snapshot()
    }

    pub(crate) fn deadline_handle(&self) -> Arc<TickDeadline> {
        Arc::clone(&self.deadline)
    }

    pub(crate) fn game_destroyed_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.game_destroyed)
    }

    pub(crate) fn fault_handle(&self) -> Arc<OnceLock<FatalError>> {
        Arc::clone(&self.fault)
    }

    pub(crate) fn counters_handle(&self) -> Arc<SyncCounters> {
        Arc::clone(&self.counters)
    }

    fn ensure_live(&self) -> Result<(), FatalError> {
        match self.fault.get() {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    fn signal_tick(&mut self, send_async: bool) -> RecvOutcome {
        self.deadline.advance(self.tick_delay_ms);
        RecvOutcome {
            tick: true,
            send_async,
        }
    }

    /// Handle a failure on the send path. Empty-queue errors have no
    /// meaning when sending, so they escalate like any unknown code.
    fn absorb_send_failure(
        &mut self,
        operation: &'static str,
        err: TransportError,
    ) -> Result<(), FatalError> {
        match err.class() {
            ErrorClass::Ignorable => self.ignore(operation, &err),
            ErrorClass::AlreadyTerminated => self.mark_destroyed(operation, &err),
            ErrorClass::Transient | ErrorClass::Fatal => return Err(self.escalate(operation, err)),
        }
        Ok(())
    }

    fn absorb_receive_failure(&mut self, err: TransportError) -> Result<(), FatalError> {
        const OPERATION: &str = "receive_turns";
        match err.class() {
            ErrorClass::Transient => trace!("no turns waiting"),
            ErrorClass::Ignorable => self.ignore(OPERATION, &err),
            ErrorClass::AlreadyTerminated => self.mark_destroyed(OPERATION, &err),
            ErrorClass::Fatal => return Err(self.escalate(OPERATION, err)),
        }
        Ok(())
    }

    fn ignore(&self, operation: &'static str, err: &TransportError) {
        self.counters.ignored_error();
        debug!(operation, error = %err, "ignoring transport error");
    }

    fn mark_destroyed(&self, operation: &'static str, err: &TransportError) {
        if !self.game_destroyed.swap(true, Ordering::AcqRel) {
            info!(operation, error = %err, "game already terminated by transport");
        }
    }

    fn escalate(&mut self, operation: &'static str, err: TransportError) -> FatalError {
        let fatal = FatalError::new(operation, err);
        error!(operation, message = %fatal.message, "fatal transport error");
        let _ = self.fault.set(fatal.clone());
        self.hooks.fatal(&fatal);
        fatal
    }
}

impl std::fmt::Debug for TurnExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnExchange")
            .field("pacing", &self.pacing)
            .field("countdowns", &self.countdowns)
            .field("epoch_armed", &self.epoch.is_armed())
            .field("next_tick_at", &self.deadline.get())
            .field("game_destroyed", &self.is_game_destroyed())
            .field("faulted", &self.fault.get().is_some())
            .finish()
    }
}
