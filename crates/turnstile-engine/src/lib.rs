//! Turn exchange, background sync, and tick scheduling for Turnstile.
//!
//! Provides the [`Session`] that negotiates pacing with a transport and
//! lets the simulation thread drive the exchange, releasing it to a
//! background sync thread in multiplayer when asked, plus the
//! [`TickScheduler`] that tells the simulation when the next tick is due.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod exchange;
pub mod metrics;
pub mod pacing;
pub mod scheduler;
pub mod session;
mod sync_thread;

pub use config::{ConfigError, PacingConfig, SessionConfig, SessionMode};
pub use exchange::{Countdowns, RecvOutcome, TurnExchange};
pub use metrics::{SyncCounters, SyncMetrics};
pub use pacing::PacingParams;
pub use scheduler::{FrameState, TickScheduler};
pub use session::{Session, ShutdownReport, SyncRelease};
