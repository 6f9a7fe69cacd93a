//! Benchmark profiles for the Turnstile turn engine.
//!
//! Provides transport capability profiles shared by the benches:
//!
//! - [`reference_caps`]: 4800 B/s at 20 turns/s over 4 players, which
//!   negotiates an update-rate divisor of 4
//! - [`broadband_caps`]: budget already above the message floor (divisor 1)
//! - [`caps_sweep`]: a spread of byte budgets for pacing derivation

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use turnstile_core::ProviderCaps;

/// Slow-link profile: the pacing negotiator doubles twice to reach the
/// 128-byte floor.
pub fn reference_caps() -> ProviderCaps {
    ProviderCaps {
        default_turns_in_transit: 3,
        default_turns_per_sec: 20,
        max_message_size: 512,
        bytes_per_sec: 4800,
        max_players: 4,
    }
}

/// Fast-link profile: one network receive per resync window.
pub fn broadband_caps() -> ProviderCaps {
    ProviderCaps {
        bytes_per_sec: 1_000_000,
        ..reference_caps()
    }
}

/// `n` profiles with byte budgets spread geometrically from 0 upwards.
pub fn caps_sweep(n: usize) -> Vec<ProviderCaps> {
    (0..n)
        .map(|i| ProviderCaps {
            bytes_per_sec: if i == 0 { 0 } else { 1u32 << (i % 24) },
            default_turns_per_sec: (i % 25) as u32,
            max_players: (i % 6) as u32,
            ..reference_caps()
        })
        .collect()
}
