//! Session configuration, validation, and error types.
//!
//! [`SessionConfig`] is the builder-input for starting a session.
//! [`validate()`](SessionConfig::validate) checks structural invariants
//! before any transport call is made.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use turnstile_core::TransportError;

// ── SessionMode ────────────────────────────────────────────────────

/// Whether the session exchanges turns with remote peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    /// Local play: no sync thread; the simulation thread drives the exchange.
    SinglePlayer,
    /// Networked play: a background sync thread drives the exchange while
    /// the simulation thread releases it.
    Multiplayer,
}

impl SessionMode {
    /// `true` for [`SessionMode::Multiplayer`].
    pub fn is_multiplayer(self) -> bool {
        matches!(self, Self::Multiplayer)
    }
}

// ── PacingConfig ───────────────────────────────────────────────────

/// Constants for deriving [`PacingParams`](crate::pacing::PacingParams)
/// from transport capabilities.
#[derive(Clone, Debug)]
pub struct PacingConfig {
    /// Turn rate the update-rate divisor is measured against. Default: 20.
    pub reference_turns_per_sec: u32,
    /// Upper bound on message size regardless of provider. Default: 512.
    pub message_size_ceiling: u32,
    /// Minimum normal message size; smaller budgets batch more turns
    /// per message instead. Default: 128.
    pub message_size_floor: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            reference_turns_per_sec: 20,
            message_size_ceiling: 512,
            message_size_floor: 128,
        }
    }
}

impl PacingConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference_turns_per_sec == 0 {
            return Err(ConfigError::InvalidPacing {
                reason: "reference_turns_per_sec must be at least 1".into(),
            });
        }
        if self.message_size_floor == 0 {
            return Err(ConfigError::InvalidPacing {
                reason: "message_size_floor must be at least 1".into(),
            });
        }
        if self.message_size_floor > self.message_size_ceiling {
            return Err(ConfigError::InvalidPacing {
                reason: format!(
                    "message_size_floor {} exceeds message_size_ceiling {}",
                    self.message_size_floor, self.message_size_ceiling
                ),
            });
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while starting a session.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Tick delay is zero or does not fit in milliseconds.
    InvalidTickDelay {
        /// The configured delay.
        value: Duration,
    },
    /// The resync window must be at least one receive cycle.
    ResyncWindowZero,
    /// The stall factor must be at least 1.
    StallFactorZero,
    /// PacingConfig invariant violated.
    InvalidPacing {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// Capability negotiation with the transport failed.
    Negotiation(TransportError),
    /// The sync thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTickDelay { value } => {
                write!(f, "tick_delay must be between 1ms and i64::MAX ms, got {value:?}")
            }
            Self::ResyncWindowZero => write!(f, "resync_window must be at least 1"),
            Self::StallFactorZero => write!(f, "stall_factor must be at least 1"),
            Self::InvalidPacing { reason } => write!(f, "invalid pacing config: {reason}"),
            Self::Negotiation(e) => write!(f, "capability negotiation: {e}"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Negotiation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for ConfigError {
    fn from(e: TransportError) -> Self {
        Self::Negotiation(e)
    }
}

// ── SessionConfig ──────────────────────────────────────────────────

/// Complete configuration for starting a turn-synchronised session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Local or networked play.
    pub mode: SessionMode,
    /// Fixed interval between simulation ticks. Default: 50ms.
    pub tick_delay: Duration,
    /// Whether this peer stamps the epoch bit on its first turn.
    pub consume_epoch_bit: bool,
    /// Receive cycles between network reads once in sync. Default: 4.
    pub resync_window: u32,
    /// Single-player gaps longer than `stall_factor * tick_delay` reset the
    /// tick baseline instead of firing catch-up ticks. Default: 10.
    pub stall_factor: u32,
    /// Message-size and rate derivation constants.
    pub pacing: PacingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::SinglePlayer,
            tick_delay: Duration::from_millis(50),
            consume_epoch_bit: false,
            resync_window: 4,
            stall_factor: 10,
            pacing: PacingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// A default configuration in the given mode.
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ms = self.tick_delay.as_millis();
        if ms == 0 || ms > i64::MAX as u128 {
            return Err(ConfigError::InvalidTickDelay {
                value: self.tick_delay,
            });
        }
        if self.resync_window == 0 {
            return Err(ConfigError::ResyncWindowZero);
        }
        if self.stall_factor == 0 {
            return Err(ConfigError::StallFactorZero);
        }
        self.pacing.validate()
    }

    /// Tick delay in whole milliseconds. Only meaningful after `validate()`.
    pub fn tick_delay_ms(&self) -> i64 {
        self.tick_delay.as_millis() as i64
    }
}
