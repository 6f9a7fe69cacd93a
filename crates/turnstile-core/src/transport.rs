//! The session transport the engine exchanges turns through.
//!
//! Implementations provide reliable multicast-like delivery of opaque turn
//! messages between peers. The engine never calls a transport from two
//! threads at once: every call happens while the session's critical
//! section is held.

use smallvec::SmallVec;

use crate::error::TransportError;

/// Hard ceiling on the number of players in a session.
pub const MAX_PLAYERS: usize = 4;

/// Capabilities reported by the transport provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderCaps {
    /// Turns a sender may have outstanding by default.
    pub default_turns_in_transit: u32,
    /// Target turn rate, in turns per second. Zero means "unspecified".
    pub default_turns_per_sec: u32,
    /// Largest message the provider will carry, in bytes.
    pub max_message_size: u32,
    /// Throughput budget, in bytes per second.
    pub bytes_per_sec: u32,
    /// Largest session the provider supports.
    pub max_players: u32,
}

/// One player's share of a received turn batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerTurn {
    /// Raw turn message, empty if the player sent nothing this turn.
    pub payload: Vec<u8>,
    /// Transport-defined per-player status flags.
    pub status: u32,
}

impl PlayerTurn {
    /// Whether the player delivered a message this turn.
    pub fn is_present(&self) -> bool {
        !self.payload.is_empty()
    }
}

/// Per-player turn messages returned by one network receive.
///
/// Slot `i` belongs to player `i`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnBatch {
    /// One entry per player slot.
    pub players: SmallVec<[PlayerTurn; MAX_PLAYERS]>,
}

impl TurnBatch {
    /// A batch with `slots` empty player entries.
    pub fn with_slots(slots: usize) -> Self {
        Self {
            players: (0..slots).map(|_| PlayerTurn::default()).collect(),
        }
    }

    /// Number of players that delivered a message.
    pub fn present_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_present()).count()
    }

    /// Total payload bytes across all players.
    pub fn total_bytes(&self) -> usize {
        self.players.iter().map(|p| p.payload.len()).sum()
    }
}

/// Session transport consumed by the turn engine.
///
/// Moved into the engine at session start (`Send`), then accessed under
/// the session's critical section only.
pub trait Transport: Send {
    /// Query provider capabilities. Called once per session.
    fn provider_caps(&mut self) -> Result<ProviderCaps, TransportError>;

    /// Number of this peer's turns currently unacknowledged.
    fn turns_in_transit(&mut self) -> Result<u32, TransportError>;

    /// Broadcast one encoded turn message to all peers.
    fn send_turn(&mut self, turn: &[u8]) -> Result<(), TransportError>;

    /// Collect the next turn from every player, up to `max_players` slots.
    fn receive_turns(&mut self, max_players: usize) -> Result<TurnBatch, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn provider_caps(&mut self) -> Result<ProviderCaps, TransportError> {
        (**self).provider_caps()
    }

    fn turns_in_transit(&mut self) -> Result<u32, TransportError> {
        (**self).turns_in_transit()
    }

    fn send_turn(&mut self, turn: &[u8]) -> Result<(), TransportError> {
        (**self).send_turn(turn)
    }

    fn receive_turns(&mut self, max_players: usize) -> Result<TurnBatch, TransportError> {
        (**self).receive_turns(max_players)
    }
}
