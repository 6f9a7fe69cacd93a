//! Criterion benchmarks for the receive-countdown hot path and pacing
//! derivation.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use turnstile_bench::{broadband_caps, caps_sweep, reference_caps};
use turnstile_core::ProviderCaps;
use turnstile_engine::{PacingConfig, PacingParams, SessionConfig, TurnExchange};
use turnstile_test_utils::{ManualClock, RecordingHooks, ScriptedTransport};

fn exchange(caps: ProviderCaps) -> TurnExchange {
    TurnExchange::start(
        &SessionConfig::default(),
        Box::new(ScriptedTransport::new(caps)),
        Box::new(RecordingHooks::new()),
        Arc::new(ManualClock::new(0)),
    )
    .unwrap()
}

/// Benchmark: 1000 polls with divisor 4 (mostly cheap polls).
fn bench_receive_polls_slow_link(c: &mut Criterion) {
    c.bench_function("exchange_1000_polls_divisor_4", |b| {
        b.iter_batched(
            || exchange(reference_caps()),
            |mut ex| {
                for _ in 0..1000 {
                    black_box(ex.receive_turns().unwrap());
                }
                ex
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: 1000 polls with divisor 1 (a network read every 4 polls).
fn bench_receive_polls_fast_link(c: &mut Criterion) {
    c.bench_function("exchange_1000_polls_divisor_1", |b| {
        b.iter_batched(
            || exchange(broadband_caps()),
            |mut ex| {
                for _ in 0..1000 {
                    black_box(ex.receive_turns().unwrap());
                }
                ex
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: 100 full sync-thread cycles (send padding, then poll).
fn bench_pump(c: &mut Criterion) {
    c.bench_function("exchange_100_pumps", |b| {
        b.iter_batched(
            || exchange(reference_caps()),
            |mut ex| {
                for _ in 0..100 {
                    black_box(ex.pump().unwrap());
                }
                ex
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: derive pacing for 256 capability profiles.
fn bench_pacing_derive(c: &mut Criterion) {
    let sweep = caps_sweep(256);
    let config = PacingConfig::default();
    c.bench_function("pacing_derive_256_profiles", |b| {
        b.iter(|| {
            for caps in &sweep {
                black_box(PacingParams::derive(black_box(caps), &config));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_receive_polls_slow_link,
    bench_receive_polls_fast_link,
    bench_pump,
    bench_pacing_derive
);
criterion_main!(benches);
