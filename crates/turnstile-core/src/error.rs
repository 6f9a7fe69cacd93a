//! Error types for the Turnstile turn engine.
//!
//! Every transport call returns its failure directly as a
//! [`TransportError`]; there is no out-of-band "last error" query. The
//! engine sorts each failure into an [`ErrorClass`] to decide whether to
//! swallow it, mark the game as already over, retry next poll, or stop.

use std::error::Error;
use std::fmt;

/// What went wrong inside a transport call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The call referenced a player slot that is no longer valid.
    InvalidPlayer,
    /// The session was torn down by the transport.
    GameTerminated,
    /// This peer is not part of a running game.
    NotInGame,
    /// A receive found no turns queued for delivery.
    NoMessagesWaiting,
    /// Any other transport-defined failure code.
    Other(u32),
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPlayer => write!(f, "invalid player"),
            Self::GameTerminated => write!(f, "game terminated"),
            Self::NotInGame => write!(f, "not in game"),
            Self::NoMessagesWaiting => write!(f, "no messages waiting"),
            Self::Other(code) => write!(f, "transport error {code:#x}"),
        }
    }
}

/// How the engine reacts to a [`TransportErrorKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Swallowed without further action.
    Ignorable,
    /// The game is already over; mark it destroyed and carry on quietly.
    AlreadyTerminated,
    /// An empty poll; recoverable on the next cycle.
    Transient,
    /// Unrecoverable: turn numbering can no longer be trusted.
    Fatal,
}

impl TransportErrorKind {
    /// Classify this failure.
    pub fn class(self) -> ErrorClass {
        match self {
            Self::InvalidPlayer => ErrorClass::Ignorable,
            Self::GameTerminated | Self::NotInGame => ErrorClass::AlreadyTerminated,
            Self::NoMessagesWaiting => ErrorClass::Transient,
            Self::Other(_) => ErrorClass::Fatal,
        }
    }
}

/// A failed transport call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    /// Machine-readable failure kind.
    pub kind: TransportErrorKind,
    /// Human-readable description supplied by the transport.
    pub message: String,
}

impl TransportError {
    /// Build an error with the given kind and message.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an error whose message is the kind's own description.
    pub fn from_kind(kind: TransportErrorKind) -> Self {
        Self {
            kind,
            message: kind.to_string(),
        }
    }

    /// Classification of this error's kind.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for TransportError {}

impl From<TransportErrorKind> for TransportError {
    fn from(kind: TransportErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

/// An unrecoverable transport fault, reported through the termination hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FatalError {
    /// The transport operation that failed (e.g. `"send_turn"`).
    pub operation: &'static str,
    /// The transport's description of the failure.
    pub message: String,
    /// The underlying failure kind.
    pub kind: TransportErrorKind,
}

impl FatalError {
    /// Wrap a transport error raised by `operation`.
    pub fn new(operation: &'static str, err: TransportError) -> Self {
        Self {
            operation,
            message: err.message,
            kind: err.kind,
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\n{}", self.operation, self.message)
    }
}

impl Error for FatalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        assert_eq!(TransportErrorKind::InvalidPlayer.class(), ErrorClass::Ignorable);
        assert_eq!(
            TransportErrorKind::GameTerminated.class(),
            ErrorClass::AlreadyTerminated
        );
        assert_eq!(TransportErrorKind::NotInGame.class(), ErrorClass::AlreadyTerminated);
        assert_eq!(TransportErrorKind::NoMessagesWaiting.class(), ErrorClass::Transient);
        assert_eq!(TransportErrorKind::Other(0x8510_0070).class(), ErrorClass::Fatal);
    }

    #[test]
    fn fatal_display_names_operation() {
        let err = TransportError::new(TransportErrorKind::Other(5), "socket closed");
        let fatal = FatalError::new("receive_turns", err);
        assert_eq!(fatal.to_string(), "receive_turns:\nsocket closed");
        assert_eq!(fatal.kind, TransportErrorKind::Other(5));
    }

    #[test]
    fn from_kind_uses_kind_description() {
        let err: TransportError = TransportErrorKind::NoMessagesWaiting.into();
        assert_eq!(err.message, "no messages waiting");
        assert_eq!(err.class(), ErrorClass::Transient);
    }
}
