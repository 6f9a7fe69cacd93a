//! Callbacks from the turn engine into the simulation layer.

use crate::error::FatalError;
use crate::transport::TurnBatch;

/// Notifications the engine delivers to the simulation layer.
///
/// Called with the session's critical section held, from whichever thread
/// is driving the exchange: the simulation thread, or the sync thread
/// while the exchange is released to it. Keep the work short: copy what
/// you need out of the batch and return.
pub trait SessionHooks: Send {
    /// A network receive delivered a fresh batch of per-player turns.
    fn turns_received(&mut self, batch: &TurnBatch);

    /// A transport call failed with an unrecoverable error.
    ///
    /// Called once per session. The fault is latched: every later
    /// exchange call returns it without touching the transport, the sync
    /// thread exits, and the tick scheduler stops reporting ticks.
    /// Whether the process itself terminates is up to the implementation.
    fn fatal(&mut self, error: &FatalError);
}

/// Hooks that ignore every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl SessionHooks for NoopHooks {
    fn turns_received(&mut self, _batch: &TurnBatch) {}

    fn fatal(&mut self, _error: &FatalError) {}
}
