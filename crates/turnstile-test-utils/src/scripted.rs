//! A transport whose answers are scripted by the test.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use turnstile_core::{
    ProviderCaps, Transport, TransportError, TransportErrorKind, TurnBatch, TurnId, MAX_PLAYERS,
};

#[derive(Debug)]
struct Script {
    caps: ProviderCaps,
    caps_error: Option<TransportErrorKind>,
    turns_in_transit: u32,
    transit_error: Option<TransportErrorKind>,
    send_error: Option<TransportErrorKind>,
    receives: VecDeque<Result<TurnBatch, TransportErrorKind>>,
    sent: Vec<Vec<u8>>,
    receive_calls: usize,
}

/// Mock [`Transport`] with queued responses.
///
/// `turns_in_transit` is a fixed value set by the test; sends do not
/// change it. Receives pop the queue in order and, once it is empty,
/// return an empty batch of [`MAX_PLAYERS`] slots. Clones share state.
#[derive(Clone, Debug)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new(caps: ProviderCaps) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script {
                caps,
                caps_error: None,
                turns_in_transit: 0,
                transit_error: None,
                send_error: None,
                receives: VecDeque::new(),
                sent: Vec::new(),
                receive_calls: 0,
            })),
        }
    }

    /// Make every `provider_caps` call fail with `kind`.
    pub fn fail_caps(&self, kind: TransportErrorKind) {
        self.script(|s| s.caps_error = Some(kind));
    }

    pub fn set_turns_in_transit(&self, n: u32) {
        self.script(|s| s.turns_in_transit = n);
    }

    /// Fail the next `turns_in_transit` query with `kind`.
    pub fn fail_turns_in_transit(&self, kind: TransportErrorKind) {
        self.script(|s| s.transit_error = Some(kind));
    }

    /// Fail the next `send_turn` with `kind`.
    pub fn fail_next_send(&self, kind: TransportErrorKind) {
        self.script(|s| s.send_error = Some(kind));
    }

    pub fn push_receive(&self, batch: TurnBatch) {
        self.script(|s| s.receives.push_back(Ok(batch)));
    }

    pub fn push_receive_error(&self, kind: TransportErrorKind) {
        self.script(|s| s.receives.push_back(Err(kind)));
    }

    /// Every turn handed to `send_turn`, decoded.
    pub fn sent_turns(&self) -> Vec<TurnId> {
        self.script(|s| s.sent.iter().filter_map(|b| TurnId::from_bytes(b)).collect())
    }

    pub fn receive_calls(&self) -> usize {
        self.script(|s| s.receive_calls)
    }

    fn script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl Transport for ScriptedTransport {
    fn provider_caps(&mut self) -> Result<ProviderCaps, TransportError> {
        self.script(|s| match s.caps_error {
            Some(kind) => Err(kind.into()),
            None => Ok(s.caps),
        })
    }

    fn turns_in_transit(&mut self) -> Result<u32, TransportError> {
        self.script(|s| match s.transit_error.take() {
            Some(kind) => Err(kind.into()),
            None => Ok(s.turns_in_transit),
        })
    }

    fn send_turn(&mut self, turn: &[u8]) -> Result<(), TransportError> {
        self.script(|s| match s.send_error.take() {
            Some(kind) => Err(kind.into()),
            None => {
                s.sent.push(turn.to_vec());
                Ok(())
            }
        })
    }

    fn receive_turns(&mut self, max_players: usize) -> Result<TurnBatch, TransportError> {
        self.script(|s| {
            s.receive_calls += 1;
            match s.receives.pop_front() {
                Some(Ok(batch)) => Ok(batch),
                Some(Err(kind)) => Err(kind.into()),
                None => Ok(TurnBatch::with_slots(max_players.min(MAX_PLAYERS))),
            }
        })
    }
}
