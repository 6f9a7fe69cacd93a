//! Turnstile: lockstep turn synchronisation for real-time multiplayer
//! simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Turnstile sub-crates. For most users, adding `turnstile` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use turnstile::prelude::*;
//! use turnstile_test_utils::{LoopbackTransport, ManualClock};
//!
//! // Single-player: no sync thread, the caller drives the exchange.
//! let (transport, mut peer) = LoopbackTransport::pair();
//! let clock = ManualClock::new(0);
//! let config = SessionConfig::new(SessionMode::SinglePlayer);
//! let session = Session::start_with_clock(
//!     config,
//!     Box::new(transport),
//!     Box::new(NoopHooks),
//!     Arc::new(clock.clone()),
//! )
//! .unwrap();
//!
//! // The simulation thread owns the exchange: submit turns 1 and onwards.
//! let next = session.exchange().send_pending_turns(1, 1).unwrap();
//! assert_eq!(next, 2);
//! peer.send_turn(&TurnId::encode(1, false).to_bytes()).unwrap();
//!
//! // The first tick is due immediately and is reported exactly once.
//! session.scheduler().update_progress(FrameState::active());
//! assert_eq!(session.scheduler().progress(), 1.0);
//! assert!(session.poll_tick().unwrap().tick);
//! assert!(!session.poll_tick().unwrap().tick);
//!
//! clock.advance(50);
//! assert!(session.poll_tick().unwrap().tick);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `turnstile-core` | Turn IDs, transport and hook traits, errors, clock |
//! | [`engine`] | `turnstile-engine` | Session, turn exchange, pacing, scheduler |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and errors (`turnstile-core`).
///
/// Contains [`types::TurnId`] and its wire codec, the [`types::Transport`]
/// and [`types::SessionHooks`] traits, and [`types::TransportError`].
pub use turnstile_core as types;

/// Session lifecycle and turn exchange (`turnstile-engine`).
///
/// [`engine::Session`] owns the exchange and the sync thread;
/// [`engine::TickScheduler`] paces the simulation thread.
pub use turnstile_engine as engine;

/// Common imports for typical Turnstile usage.
///
/// ```rust
/// use turnstile::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use turnstile_core::{
        Clock, NoopHooks, ProviderCaps, SessionHooks, SystemClock, Transport, TurnBatch, TurnId,
    };

    // Errors
    pub use turnstile_core::{FatalError, TransportError, TransportErrorKind};

    // Engine
    pub use turnstile_engine::{
        ConfigError, FrameState, RecvOutcome, Session, SessionConfig, SessionMode,
        ShutdownReport, SyncMetrics, SyncRelease, TickScheduler,
    };
}
