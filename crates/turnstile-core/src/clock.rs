//! Millisecond clock used for tick pacing.
//!
//! Pacing arithmetic is signed (a deadline may lie in the past or the
//! future), so timestamps are `i64` milliseconds on a monotonic,
//! process-local timeline.

use std::sync::OnceLock;
use std::time::Instant;

/// Source of monotonic millisecond timestamps.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since an arbitrary fixed origin.
    fn now_millis(&self) -> i64;
}

/// Clock backed by [`monotonic_millis`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        monotonic_millis()
    }
}

/// Returns monotonic milliseconds since a process-local origin.
///
/// The origin is an `OnceLock<Instant>` initialised on first call. Not
/// wall-clock time; only meaningful for differences.
pub fn monotonic_millis() -> i64 {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    let origin = ORIGIN.get_or_init(Instant::now);
    Instant::now().duration_since(*origin).as_millis() as i64
}
