//! Core types and traits for the Turnstile lockstep turn engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Turnstile workspace:
//! turn identifiers and their wire codec, the transport and hook traits
//! the engine calls into, error types, and the clock abstraction.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod hooks;
pub mod timing;
pub mod transport;
pub mod turn;

pub use clock::{monotonic_millis, Clock, SystemClock};
pub use error::{ErrorClass, FatalError, TransportError, TransportErrorKind};
pub use hooks::{NoopHooks, SessionHooks};
pub use timing::{ProgressFraction, TickDeadline};
pub use transport::{PlayerTurn, ProviderCaps, Transport, TurnBatch, MAX_PLAYERS};
pub use turn::{advance_counter, EpochLatch, TurnId};
