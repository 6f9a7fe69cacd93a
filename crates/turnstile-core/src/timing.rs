//! Lock-free cells shared between the sync thread and the simulation thread.
//!
//! The turn exchange writes the tick deadline while holding the session's
//! critical section; the scheduler and render path read it (and the
//! progress fraction) without taking that lock.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

/// Timestamp (ms) at which the next simulation tick is due.
///
/// Advanced by one tick delay whenever the exchange signals a tick, and
/// realigned to "now" after a resynchronisation.
#[derive(Debug, Default)]
pub struct TickDeadline {
    at: AtomicI64,
}

// Compile-time assertion: shared cells must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TickDeadline>();
    assert::<ProgressFraction>();
};

impl TickDeadline {
    /// A deadline at `at_ms`.
    pub fn new(at_ms: i64) -> Self {
        Self {
            at: AtomicI64::new(at_ms),
        }
    }

    /// Current deadline.
    pub fn get(&self) -> i64 {
        self.at.load(Ordering::Acquire)
    }

    /// Replace the deadline.
    pub fn set(&self, at_ms: i64) {
        self.at.store(at_ms, Ordering::Release);
    }

    /// Push the deadline back by `delay_ms`. Returns the new deadline.
    pub fn advance(&self, delay_ms: i64) -> i64 {
        self.at.fetch_add(delay_ms, Ordering::AcqRel) + delay_ms
    }
}

/// Fractional progress toward the next tick, for interpolated rendering.
///
/// Stored as `f32` bits in an `AtomicU32`. Always within `[0, 1]`.
#[derive(Debug, Default)]
pub struct ProgressFraction {
    bits: AtomicU32,
}

impl ProgressFraction {
    /// A fraction starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current fraction.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Store `value`, clamped to `[0, 1]`. NaN stores zero.
    pub fn set(&self, value: f32) {
        let clamped = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        self.bits.store(clamped.to_bits(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_advances() {
        let d = TickDeadline::new(1000);
        assert_eq!(d.advance(50), 1050);
        assert_eq!(d.get(), 1050);
        d.set(10);
        assert_eq!(d.get(), 10);
    }

    #[test]
    fn progress_clamps() {
        let p = ProgressFraction::new();
        assert_eq!(p.get(), 0.0);
        p.set(0.25);
        assert_eq!(p.get(), 0.25);
        p.set(3.0);
        assert_eq!(p.get(), 1.0);
        p.set(-1.0);
        assert_eq!(p.get(), 0.0);
        p.set(f32::NAN);
        assert_eq!(p.get(), 0.0);
    }
}
