//! Criterion micro-benchmarks for the turn codec.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use turnstile_core::{advance_counter, EpochLatch, TurnId};

/// Benchmark: encode 1000 consecutive turns, epoch bit on the first.
fn bench_encode_turns(c: &mut Criterion) {
    c.bench_function("codec_encode_1000_turns", |b| {
        b.iter(|| {
            let mut latch = EpochLatch::new(true);
            let mut counter = 0x7FFF_FC00u32;
            let mut buf = [0u8; TurnId::WIRE_LEN];
            for _ in 0..1000 {
                buf = TurnId::encode(counter, latch.take()).to_bytes();
                counter = advance_counter(counter, 1);
            }
            black_box(buf);
        });
    });
}

/// Benchmark: decode a 4 KiB stream of wire turns.
fn bench_decode_turns(c: &mut Criterion) {
    let wire: Vec<u8> = (0..1024u32)
        .flat_map(|i| TurnId::encode(i, i == 0).to_bytes())
        .collect();

    c.bench_function("codec_decode_1024_turns", |b| {
        b.iter(|| {
            let mut epochs = 0u32;
            for chunk in wire.chunks_exact(TurnId::WIRE_LEN) {
                if let Some(id) = TurnId::from_bytes(black_box(chunk)) {
                    epochs += u32::from(id.has_epoch());
                }
            }
            black_box(epochs);
        });
    });
}

/// Benchmark: counter advance across the wrap threshold.
fn bench_advance_wrap(c: &mut Criterion) {
    c.bench_function("codec_advance_across_wrap", |b| {
        b.iter(|| {
            let mut counter = 0x7FFF_FF00u32;
            for _ in 0..512 {
                counter = advance_counter(black_box(counter), 1);
            }
            black_box(counter);
        });
    });
}

criterion_group!(
    benches,
    bench_encode_turns,
    bench_decode_turns,
    bench_advance_wrap
);
criterion_main!(benches);
