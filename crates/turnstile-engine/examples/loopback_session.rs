//! Turnstile loopback demo: two peers in one process.
//!
//! Demonstrates:
//!   1. Starting two multiplayer sessions over a loopback transport pair
//!   2. Releasing the exchange to the sync threads while "loading"
//!   3. Driving each peer's simulation loop off `has_tick_elapsed()`,
//!      submitting real turns and polling through `exchange()`
//!   4. Reading interpolation progress and shutting down cleanly
//!
//! Run with:
//!   RUST_LOG=turnstile_engine=debug cargo run --example loopback_session

use std::thread;
use std::time::{Duration, Instant};

use tracing_subscriber::{fmt, EnvFilter};
use turnstile_core::FatalError;
use turnstile_engine::{FrameState, Session, SessionConfig, SessionMode};
use turnstile_test_utils::{LoopbackTransport, RecordingHooks};

// ─── Parameters ─────────────────────────────────────────────────

const RUN_FOR: Duration = Duration::from_secs(2);
const TICK_DELAY: Duration = Duration::from_millis(25);
const LOADING: Duration = Duration::from_millis(200);

/// Run the simulation for `RUN_FOR`, returning the ticks seen.
fn simulate(name: &str, session: &Session) -> Result<u32, FatalError> {
    let started = Instant::now();
    let mut turn = 1;
    let mut ticks = 0;
    while started.elapsed() < RUN_FOR {
        if session.scheduler().has_tick_elapsed() {
            let mut exchange = session.exchange();
            turn = exchange.send_pending_turns(turn, 1)?;
            if exchange.receive_turns()?.tick {
                ticks += 1;
                if ticks % 20 == 0 {
                    println!(
                        "{name}: tick {ticks:>3}  progress {:.2}  next turn {turn}",
                        session.scheduler().progress()
                    );
                }
            }
        }
        session.scheduler().update_progress(FrameState::active());
        thread::sleep(Duration::from_millis(2));
    }
    Ok(ticks)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = SessionConfig {
        tick_delay: TICK_DELAY,
        ..SessionConfig::new(SessionMode::Multiplayer)
    };
    let (left, right) = LoopbackTransport::pair();
    let left_hooks = RecordingHooks::new();
    let right_hooks = RecordingHooks::new();

    let mut host = Session::start(
        SessionConfig {
            consume_epoch_bit: true,
            ..config.clone()
        },
        Box::new(left),
        Box::new(left_hooks.clone()),
    )?;
    let mut guest = Session::start(config, Box::new(right), Box::new(right_hooks.clone()))?;

    // ─── Loading: the sync threads keep both peers in step ──────

    {
        let _host = host.release_to_sync();
        let _guest = guest.release_to_sync();
        thread::sleep(LOADING);
    }
    println!(
        "loading done: host {} batches, guest {} batches",
        left_hooks.batches_received(),
        right_hooks.batches_received()
    );

    // ─── Simulation loops, one thread per peer ──────────────────

    let guest_loop = thread::spawn(move || {
        let result = simulate("guest", &guest);
        (guest, result)
    });
    let host_ticks = simulate("host", &host)?;
    let (mut guest, guest_result) = guest_loop
        .join()
        .map_err(|_| "guest simulation thread panicked")?;
    let guest_ticks = guest_result?;
    let expected = RUN_FOR.as_millis() / TICK_DELAY.as_millis();
    println!("host saw {host_ticks} ticks, guest saw {guest_ticks} ticks in {RUN_FOR:?} (expected ~{expected})");

    // ─── Shutdown ───────────────────────────────────────────────

    let host_report = host.stop();
    let guest_report = guest.stop();
    println!(
        "host:  sent {} turns, {} receives, stopped in {}ms",
        host_report.metrics.turns_sent, host_report.metrics.network_receives, host_report.total_ms
    );
    println!(
        "guest: sent {} turns, {} receives, {} batches seen",
        guest_report.metrics.turns_sent,
        guest_report.metrics.network_receives,
        right_hooks.batches_received()
    );
    println!("host saw {} batches", left_hooks.batches_received());
    Ok(())
}
