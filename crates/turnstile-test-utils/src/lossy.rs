//! Seeded packet-loss injection for any transport.
//!
//! Uses a ChaCha8 RNG so a given seed always drops the same polls.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use turnstile_core::{ProviderCaps, Transport, TransportError, TransportErrorKind, TurnBatch};

/// Wraps a transport and turns a fraction of receives into
/// "no messages waiting" without touching the inner transport.
#[derive(Debug)]
pub struct LossyTransport<T> {
    inner: T,
    rng: ChaCha8Rng,
    drop_per_mille: u32,
    dropped: usize,
}

impl<T: Transport> LossyTransport<T> {
    /// Drop roughly `drop_per_mille` out of every 1000 receives.
    pub fn new(inner: T, seed: u64, drop_per_mille: u32) -> Self {
        Self {
            inner,
            rng: ChaCha8Rng::seed_from_u64(seed),
            drop_per_mille: drop_per_mille.min(1000),
            dropped: 0,
        }
    }

    /// Receives dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for LossyTransport<T> {
    fn provider_caps(&mut self) -> Result<ProviderCaps, TransportError> {
        self.inner.provider_caps()
    }

    fn turns_in_transit(&mut self) -> Result<u32, TransportError> {
        self.inner.turns_in_transit()
    }

    fn send_turn(&mut self, turn: &[u8]) -> Result<(), TransportError> {
        self.inner.send_turn(turn)
    }

    fn receive_turns(&mut self, max_players: usize) -> Result<TurnBatch, TransportError> {
        if self.rng.next_u32() % 1000 < self.drop_per_mille {
            self.dropped += 1;
            return Err(TransportErrorKind::NoMessagesWaiting.into());
        }
        self.inner.receive_turns(max_players)
    }
}
