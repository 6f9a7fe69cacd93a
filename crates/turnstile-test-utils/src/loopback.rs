//! In-process transport connecting two peers over crossbeam channels.
//!
//! Every turn a peer sends is delivered to both peers (itself included),
//! one unbounded channel per (sender, receiver) pair. A receive succeeds
//! only once a turn from every player is available, which is the
//! lockstep delivery guarantee the engine expects from a real provider.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use turnstile_core::{
    PlayerTurn, ProviderCaps, Transport, TransportError, TransportErrorKind, TurnBatch,
};

const PLAYERS: usize = 2;

/// One side of a loopback pair.
#[derive(Debug)]
pub struct LoopbackTransport {
    player: usize,
    caps: ProviderCaps,
    /// `outbox[dst]` delivers to player `dst`.
    outbox: Vec<Sender<Vec<u8>>>,
    /// `inbox[src]` carries turns from player `src`.
    inbox: Vec<Receiver<Vec<u8>>>,
    /// Turns pulled off `inbox` while waiting for the other player.
    pending: Vec<Option<Vec<u8>>>,
}

impl LoopbackTransport {
    /// Capabilities reported by [`pair`](Self::pair).
    pub fn default_caps() -> ProviderCaps {
        ProviderCaps {
            default_turns_in_transit: 1,
            default_turns_per_sec: 20,
            max_message_size: 512,
            bytes_per_sec: 1_000_000,
            max_players: PLAYERS as u32,
        }
    }

    /// Two connected peers, players 0 and 1.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_caps(Self::default_caps())
    }

    pub fn pair_with_caps(caps: ProviderCaps) -> (Self, Self) {
        // channels[src][dst]
        let channels: Vec<Vec<(Sender<Vec<u8>>, Receiver<Vec<u8>>)>> = (0..PLAYERS)
            .map(|_| (0..PLAYERS).map(|_| crossbeam_channel::unbounded()).collect())
            .collect();
        let peer = |player: usize| Self {
            player,
            caps,
            outbox: (0..PLAYERS)
                .map(|dst| channels[player][dst].0.clone())
                .collect(),
            inbox: (0..PLAYERS)
                .map(|src| channels[src][player].1.clone())
                .collect(),
            pending: vec![None; PLAYERS],
        };
        (peer(0), peer(1))
    }

    /// This peer's player slot.
    pub fn player(&self) -> usize {
        self.player
    }

    fn disconnected() -> TransportError {
        TransportError::new(TransportErrorKind::GameTerminated, "loopback peer dropped")
    }
}

impl Transport for LoopbackTransport {
    fn provider_caps(&mut self) -> Result<ProviderCaps, TransportError> {
        Ok(self.caps)
    }

    /// Own turns not yet received back locally.
    fn turns_in_transit(&mut self) -> Result<u32, TransportError> {
        let me = self.player;
        let queued = self.inbox[me].len() + usize::from(self.pending[me].is_some());
        Ok(queued as u32)
    }

    fn send_turn(&mut self, turn: &[u8]) -> Result<(), TransportError> {
        for tx in &self.outbox {
            tx.send(turn.to_vec()).map_err(|_| Self::disconnected())?;
        }
        Ok(())
    }

    fn receive_turns(&mut self, max_players: usize) -> Result<TurnBatch, TransportError> {
        for (src, slot) in self.pending.iter_mut().enumerate() {
            if slot.is_some() {
                continue;
            }
            match self.inbox[src].try_recv() {
                Ok(turn) => *slot = Some(turn),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return Err(Self::disconnected()),
            }
        }
        if self.pending.iter().any(Option::is_none) {
            return Err(TransportErrorKind::NoMessagesWaiting.into());
        }

        let players = self
            .pending
            .iter_mut()
            .take(max_players)
            .map(|slot| PlayerTurn {
                payload: slot.take().unwrap_or_default(),
                status: 0,
            })
            .collect();
        // Slots beyond `max_players` are discarded with the rest.
        self.pending.iter_mut().for_each(|slot| *slot = None);
        Ok(TurnBatch { players })
    }
}
