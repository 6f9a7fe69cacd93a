//! Test utilities and mock types for Turnstile development.
//!
//! Provides a [`ScriptedTransport`] whose responses are queued up front,
//! a [`LoopbackTransport`] pair that delivers turns between two in-process
//! peers, a seeded [`LossyTransport`] wrapper, a [`ManualClock`], and
//! [`RecordingHooks`] that capture every notification.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod clock;
pub mod hooks;
pub mod loopback;
pub mod lossy;
pub mod scripted;

pub use clock::ManualClock;
pub use hooks::RecordingHooks;
pub use loopback::LoopbackTransport;
pub use lossy::LossyTransport;
pub use scripted::ScriptedTransport;
