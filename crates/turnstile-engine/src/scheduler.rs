//! Tick scheduling and progress estimation for the simulation thread.
//!
//! The scheduler only reads the tick deadline and fault slot the turn
//! exchange maintains; it never takes the session lock. In single-player
//! it may also move the deadline forward to swallow a long suspension.
//! Once the exchange has latched a fatal fault no further ticks are due.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::warn;
use turnstile_core::{Clock, FatalError, ProgressFraction, TickDeadline};

use crate::config::{SessionConfig, SessionMode};

/// Simulation-layer state that gates progress updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameState {
    /// A game is running.
    pub running: bool,
    /// The game is paused.
    pub paused: bool,
    /// A menu is open and capturing input.
    pub menu_active: bool,
    /// Player logic is being processed this frame.
    pub processing_players: bool,
}

impl FrameState {
    /// Running, unpaused, no menu, processing players.
    pub fn active() -> Self {
        Self {
            running: true,
            paused: false,
            menu_active: false,
            processing_players: true,
        }
    }
}

/// Answers "is a tick due?" and "how far toward the next tick are we?".
pub struct TickScheduler {
    deadline: Arc<TickDeadline>,
    fault: Arc<OnceLock<FatalError>>,
    progress: Arc<ProgressFraction>,
    clock: Arc<dyn Clock>,
    mode: SessionMode,
    tick_delay_ms: i64,
    stall_threshold_ms: i64,
    stall_reported: AtomicBool,
}

impl TickScheduler {
    /// Build a scheduler reading `deadline` that halts once `fault` is set.
    pub fn new(
        config: &SessionConfig,
        deadline: Arc<TickDeadline>,
        fault: Arc<OnceLock<FatalError>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tick_delay_ms = config.tick_delay_ms();
        Self {
            deadline,
            fault,
            progress: Arc::new(ProgressFraction::new()),
            clock,
            mode: config.mode,
            tick_delay_ms,
            stall_threshold_ms: tick_delay_ms.saturating_mul(i64::from(config.stall_factor)),
            stall_reported: AtomicBool::new(false),
        }
    }

    /// Whether the next simulation tick is due.
    ///
    /// In single-player a gap longer than `stall_factor` tick delays (the
    /// process was suspended) moves the baseline to now and reports
    /// `false`, instead of firing a burst of catch-up ticks. Always
    /// `false` once the exchange has halted on a fatal fault.
    pub fn has_tick_elapsed(&self) -> bool {
        if self.is_halted() {
            return false;
        }
        let now = self.clock.now_millis();
        let elapsed = now - self.deadline.get();
        if elapsed > self.stall_threshold_ms {
            match self.mode {
                SessionMode::SinglePlayer => {
                    self.deadline.set(now);
                    return false;
                }
                SessionMode::Multiplayer => {
                    if !self.stall_reported.swap(true, Ordering::Relaxed) {
                        warn!(elapsed_ms = elapsed, "multiplayer tick deadline stalled");
                    }
                }
            }
        } else {
            self.stall_reported.store(false, Ordering::Relaxed);
        }
        elapsed >= 0
    }

    /// Whether a fatal fault has stopped the tick cadence for good.
    pub fn is_halted(&self) -> bool {
        self.fault.get().is_some()
    }

    /// Recompute the progress fraction toward the next tick.
    ///
    /// A no-op while the game is not running, is paused, is not
    /// processing players, or (single-player) a menu holds input.
    pub fn update_progress(&self, frame: FrameState) {
        if !frame.running || frame.paused || !frame.processing_players {
            return;
        }
        if self.mode == SessionMode::SinglePlayer && frame.menu_active {
            return;
        }

        let remaining = self.deadline.get() - self.clock.now_millis();
        if remaining <= 0 {
            self.progress.set(1.0);
            return;
        }
        let advanced = self.tick_delay_ms - remaining;
        self.progress.set(advanced as f32 / self.tick_delay_ms as f32);
    }

    /// Last computed progress fraction, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress.get()
    }

    /// Shared handle to the progress fraction, for a render thread.
    pub fn progress_handle(&self) -> Arc<ProgressFraction> {
        Arc::clone(&self.progress)
    }

    /// Timestamp (ms) at which the next tick is due.
    pub fn next_tick_at(&self) -> i64 {
        self.deadline.get()
    }
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("mode", &self.mode)
            .field("tick_delay_ms", &self.tick_delay_ms)
            .field("next_tick_at", &self.deadline.get())
            .field("progress", &self.progress.get())
            .field("halted", &self.is_halted())
            .finish()
    }
}
