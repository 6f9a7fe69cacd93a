//! Turn identifiers, the counter wrap rule, and the epoch-bit latch.
//!
//! A turn identifier is a 32-bit value: the high bit marks the first turn
//! of a session generation (the "epoch bit"), the low 31 bits are a
//! monotonically advancing counter. On the wire a turn is four bytes,
//! little-endian.

use std::fmt;

/// Identifies one turn message exchanged between peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u32);

impl TurnId {
    /// The epoch marker bit.
    pub const EPOCH_BIT: u32 = 0x8000_0000;
    /// Mask selecting the 31-bit counter.
    pub const COUNTER_MASK: u32 = 0x7FFF_FFFF;
    /// Counters at or above this value wrap.
    pub const WRAP_THRESHOLD: u32 = 0x7FFF_FFFF;
    /// Mask applied to a counter that reached [`WRAP_THRESHOLD`](Self::WRAP_THRESHOLD).
    pub const WRAP_MASK: u32 = 0xFFFF;
    /// Size of an encoded turn on the wire.
    pub const WIRE_LEN: usize = 4;

    /// Build a turn identifier from a counter, optionally carrying the
    /// epoch bit. Any high bit already present in `counter` is discarded.
    pub fn encode(counter: u32, with_epoch: bool) -> Self {
        let epoch = if with_epoch { Self::EPOCH_BIT } else { 0 };
        Self(epoch | (counter & Self::COUNTER_MASK))
    }

    /// The 31-bit counter portion.
    pub fn counter(self) -> u32 {
        self.0 & Self::COUNTER_MASK
    }

    /// Whether this turn carries the epoch bit.
    pub fn has_epoch(self) -> bool {
        self.0 & Self::EPOCH_BIT != 0
    }

    /// Little-endian wire form.
    pub fn to_bytes(self) -> [u8; Self::WIRE_LEN] {
        self.0.to_le_bytes()
    }

    /// Decode the leading four bytes of a turn message.
    ///
    /// Returns `None` if the buffer is shorter than [`WIRE_LEN`](Self::WIRE_LEN).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let head: [u8; Self::WIRE_LEN] = bytes.get(..Self::WIRE_LEN)?.try_into().ok()?;
        Some(Self(u32::from_le_bytes(head)))
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_epoch() {
            write!(f, "{}*", self.counter())
        } else {
            write!(f, "{}", self.counter())
        }
    }
}

impl From<u32> for TurnId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Advance a turn counter by `delta`.
///
/// A result at or above `0x7FFF_FFFF` is masked down to its low 16 bits,
/// so the counter never enters the epoch bit and a step of one from
/// `0x7FFF_FFFE` lands on `0xFFFF`.
pub fn advance_counter(counter: u32, delta: u32) -> u32 {
    let next = counter.wrapping_add(delta);
    if next >= TurnId::WRAP_THRESHOLD {
        next & TurnId::WRAP_MASK
    } else {
        next
    }
}

/// One-shot holder for the epoch bit.
///
/// Armed at session start by whichever peer owns epoch-setting; the first
/// turn encoded afterwards consumes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EpochLatch {
    armed: bool,
}

impl EpochLatch {
    /// A latch that is armed iff `armed`.
    pub fn new(armed: bool) -> Self {
        Self { armed }
    }

    /// Arm the latch so the next encoded turn carries the epoch bit.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Whether the next encoded turn would carry the epoch bit.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Consume the latch: returns whether the epoch bit applies to the turn
    /// being encoded now, and clears it for every later turn.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_sets_epoch_bit() {
        let t = TurnId::encode(7, true);
        assert_eq!(t.0, 0x8000_0007);
        assert!(t.has_epoch());
        assert_eq!(t.counter(), 7);
    }

    #[test]
    fn encode_strips_stray_high_bit() {
        let t = TurnId::encode(0x8000_0010, false);
        assert!(!t.has_epoch());
        assert_eq!(t.counter(), 0x10);
    }

    #[test]
    fn wrap_lands_on_ffff() {
        assert_eq!(advance_counter(0x7FFF_FFFE, 1), 0xFFFF);
    }

    #[test]
    fn wrap_masks_low_bits_for_larger_steps() {
        assert_eq!(advance_counter(0x7FFF_FFF0, 0x20), 0x0010);
    }

    #[test]
    fn zero_delta_is_identity_below_threshold() {
        assert_eq!(advance_counter(1234, 0), 1234);
    }

    #[test]
    fn wire_form_is_little_endian() {
        let t = TurnId(0x8000_0102);
        assert_eq!(t.to_bytes(), [0x02, 0x01, 0x00, 0x80]);
        assert_eq!(TurnId::from_bytes(&[0x02, 0x01, 0x00, 0x80, 0xAA]), Some(t));
    }

    #[test]
    fn short_buffer_does_not_decode() {
        assert_eq!(TurnId::from_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn latch_fires_once() {
        let mut latch = EpochLatch::new(true);
        assert!(latch.is_armed());
        assert!(latch.take());
        assert!(!latch.take());
        assert!(!latch.is_armed());

        latch.arm();
        assert!(latch.take());
    }

    #[test]
    fn display_marks_epoch() {
        assert_eq!(TurnId::encode(5, true).to_string(), "5*");
        assert_eq!(TurnId::encode(5, false).to_string(), "5");
    }

    proptest! {
        #[test]
        fn advance_never_reaches_threshold(
            start in 0u32..TurnId::WRAP_THRESHOLD,
            delta in 0u32..=0x7FFF_FFFF,
            steps in 1usize..64,
        ) {
            let mut c = start;
            for _ in 0..steps {
                c = advance_counter(c, delta);
                prop_assert!(c < TurnId::WRAP_THRESHOLD);
            }
        }

        #[test]
        fn counter_survives_encoding(counter in 0u32..TurnId::WRAP_THRESHOLD, epoch in any::<bool>()) {
            let t = TurnId::encode(counter, epoch);
            prop_assert_eq!(t.counter(), counter);
            prop_assert_eq!(t.has_epoch(), epoch);
        }
    }
}
