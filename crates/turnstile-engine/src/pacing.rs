//! Transport capability negotiation.
//!
//! Runs once at session start. Turns the provider's reported throughput
//! and turn rate into an update-rate divisor and a normal message size:
//! when the per-player byte budget for one turn is below the floor, the
//! engine instead sends larger messages less often, doubling both until
//! the floor is met.

use tracing::debug;
use turnstile_core::{ProviderCaps, Transport, TransportError, MAX_PLAYERS};

use crate::config::PacingConfig;

/// Per-session pacing constants derived from transport capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingParams {
    /// Turns this peer keeps in flight. At least 1.
    pub turns_in_transit_target: u32,
    /// Ticks per network receive cycle. At least 1.
    pub update_rate_divisor: u32,
    /// Largest message this session will send.
    pub max_message_size: u32,
    /// Target size of an ordinary turn message. Never above `max_message_size`.
    pub normal_message_size: u32,
    /// Quarter of the provider's byte budget, reserved for delta sync.
    pub delta_bytes_per_sec: u32,
}

impl PacingParams {
    /// Query the transport's capabilities and derive pacing from them.
    ///
    /// Transport failures propagate unchanged.
    pub fn negotiate(
        transport: &mut dyn Transport,
        config: &PacingConfig,
    ) -> Result<Self, TransportError> {
        let caps = transport.provider_caps()?;
        let params = Self::derive(&caps, config);
        debug!(
            ?caps,
            turns_in_transit = params.turns_in_transit_target,
            update_rate = params.update_rate_divisor,
            normal_msg = params.normal_message_size,
            max_msg = params.max_message_size,
            "negotiated session pacing"
        );
        Ok(params)
    }

    /// Pure derivation from already-fetched capabilities.
    pub fn derive(caps: &ProviderCaps, config: &PacingConfig) -> Self {
        let reference = config.reference_turns_per_sec.max(1);
        let turns_in_transit_target = caps.default_turns_in_transit.max(1);

        let mut update_rate_divisor =
            if caps.default_turns_per_sec != 0 && caps.default_turns_per_sec <= reference {
                reference / caps.default_turns_per_sec
            } else {
                1
            };

        let max_message_size = caps.max_message_size.min(config.message_size_ceiling);
        let delta_bytes_per_sec = caps.bytes_per_sec / 4;

        let players = (caps.max_players as usize).clamp(1, MAX_PLAYERS) as u64;
        let mut normal = u64::from(caps.bytes_per_sec) * u64::from(update_rate_divisor)
            / u64::from(reference);
        normal = normal * 3 / 4;
        normal /= players;
        // A zero budget would never reach the floor by doubling.
        normal = normal.max(1);

        let floor = u64::from(config.message_size_floor.max(1));
        while normal < floor {
            normal *= 2;
            update_rate_divisor = update_rate_divisor.saturating_mul(2);
        }

        let normal_message_size = normal.min(u64::from(max_message_size)) as u32;

        Self {
            turns_in_transit_target,
            update_rate_divisor,
            max_message_size,
            normal_message_size,
            delta_bytes_per_sec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use turnstile_core::TransportErrorKind;
    use turnstile_test_utils::ScriptedTransport;

    fn caps(bytes: u32, turns: u32, max_msg: u32, players: u32) -> ProviderCaps {
        ProviderCaps {
            default_turns_in_transit: 2,
            default_turns_per_sec: turns,
            max_message_size: max_msg,
            bytes_per_sec: bytes,
            max_players: players,
        }
    }

    #[test]
    fn reference_profile_converges() {
        // 4800 * 1 / 20 = 240; * 3/4 = 180; / 4 = 45; doubled twice = 180.
        let p = PacingParams::derive(&caps(4800, 20, 512, 4), &PacingConfig::default());
        assert_eq!(p.normal_message_size, 180);
        assert_eq!(p.update_rate_divisor, 4);
        assert_eq!(p.max_message_size, 512);
        assert_eq!(p.delta_bytes_per_sec, 1200);
        assert_eq!(p.turns_in_transit_target, 2);
    }

    #[test]
    fn slow_turn_rate_raises_divisor() {
        let p = PacingParams::derive(&caps(100_000, 5, 512, 2), &PacingConfig::default());
        // 20 / 5 = 4, budget already above the floor.
        assert_eq!(p.update_rate_divisor, 4);
        assert_eq!(p.normal_message_size, 512);
    }

    #[test]
    fn unspecified_turn_rate_uses_divisor_one() {
        let p = PacingParams::derive(&caps(1_000_000, 0, 512, 4), &PacingConfig::default());
        assert_eq!(p.update_rate_divisor, 1);
        let p = PacingParams::derive(&caps(1_000_000, 60, 512, 4), &PacingConfig::default());
        assert_eq!(p.update_rate_divisor, 1);
    }

    #[test]
    fn small_provider_message_limit_caps_everything() {
        let p = PacingParams::derive(&caps(1_000_000, 20, 64, 4), &PacingConfig::default());
        assert_eq!(p.max_message_size, 64);
        assert_eq!(p.normal_message_size, 64);
    }

    #[test]
    fn zero_turns_in_transit_becomes_one() {
        let mut c = caps(4800, 20, 512, 4);
        c.default_turns_in_transit = 0;
        let p = PacingParams::derive(&c, &PacingConfig::default());
        assert_eq!(p.turns_in_transit_target, 1);
    }

    #[test]
    fn zero_budget_and_players_terminate() {
        let p = PacingParams::derive(&caps(0, 20, 512, 0), &PacingConfig::default());
        assert_eq!(p.normal_message_size, 128);
        assert_eq!(p.update_rate_divisor, 128);
    }

    #[test]
    fn players_clamped_to_ceiling() {
        let eight = PacingParams::derive(&caps(64_000, 20, 512, 8), &PacingConfig::default());
        let four = PacingParams::derive(&caps(64_000, 20, 512, 4), &PacingConfig::default());
        assert_eq!(eight, four);
    }

    #[test]
    fn negotiate_propagates_transport_error() {
        let mut transport = ScriptedTransport::new(caps(4800, 20, 512, 4));
        transport.fail_caps(TransportErrorKind::Other(9));
        let err = PacingParams::negotiate(&mut transport, &PacingConfig::default()).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Other(9));
    }

    #[test]
    fn negotiate_reads_caps() {
        let mut transport = ScriptedTransport::new(caps(4800, 20, 512, 4));
        let p = PacingParams::negotiate(&mut transport, &PacingConfig::default()).unwrap();
        assert_eq!(p.normal_message_size, 180);
    }

    proptest! {
        #[test]
        fn derived_params_respect_invariants(
            bytes in 0u32..10_000_000,
            turns in 0u32..100,
            max_msg in 1u32..4096,
            players in 0u32..16,
        ) {
            let config = PacingConfig::default();
            let p = PacingParams::derive(&caps(bytes, turns, max_msg, players), &config);
            prop_assert!(p.update_rate_divisor >= 1);
            prop_assert!(p.turns_in_transit_target >= 1);
            prop_assert!(p.max_message_size <= config.message_size_ceiling);
            prop_assert!(p.normal_message_size <= p.max_message_size);
            if p.max_message_size >= config.message_size_floor {
                prop_assert!(p.normal_message_size >= config.message_size_floor);
            }
        }

        #[test]
        fn doubling_keeps_divisor_a_power_of_two_multiple(
            bytes in 0u32..20_000,
            players in 1u32..=4,
        ) {
            // With turns_per_sec = 20 the base divisor is 1, so every
            // adjustment leaves a power of two.
            let p = PacingParams::derive(&caps(bytes, 20, 512, players), &PacingConfig::default());
            prop_assert!(p.update_rate_divisor.is_power_of_two());
        }
    }
}
