//! Benchmark tests for cueplay-core operations
//!
//! Run with: cargo bench -p cueplay-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use cueplay_core::events::{EventBus, EventKind, PlayerEvent};
use cueplay_core::timers::{buffering_tick, playback_tick, PollPurpose, PollingTimers};
use cueplay_core::{
    percent, PlayerAdapter, PlayerConfig, PlayerState, RemoteEvent, RemoteValue, SimulatedPlayer,
};

// ============================================================================
// Helpers
// ============================================================================

fn loaded_adapter(sim: &SimulatedPlayer) -> PlayerAdapter {
    let mut adapter =
        PlayerAdapter::new("bench", PlayerConfig::with_video("abc"), sim.clone()).unwrap();
    let id = adapter.player_id();
    adapter.on_external_player_ready(&id);
    adapter
}

// ============================================================================
// State Machine Benchmarks
// ============================================================================

fn bench_state_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("State Changes");

    let cycle = [
        PlayerState::Buffering,
        PlayerState::Playing,
        PlayerState::Paused,
        PlayerState::Playing,
        PlayerState::Ended,
    ];

    for &subscribers in &[0usize, 1, 10, 50] {
        group.bench_with_input(
            BenchmarkId::new("apply_remote_state_change", subscribers),
            &subscribers,
            |b, &subscribers| {
                let sim = SimulatedPlayer::new();
                sim.set_bytes(1000.0, 1000.0);
                let mut adapter = loaded_adapter(&sim);
                for _ in 0..subscribers {
                    adapter.on_any(|event| {
                        black_box(event);
                    });
                }
                b.iter(|| {
                    for state in cycle {
                        adapter.apply_remote_state_change(black_box(state));
                    }
                    sim.clear_commands();
                });
            },
        );
    }

    group.bench_function("handle_remote_callback", |b| {
        let sim = SimulatedPlayer::new();
        let mut adapter = loaded_adapter(&sim);
        let playing = RemoteValue::from(PlayerState::Playing.id());
        let paused = RemoteValue::from(PlayerState::Paused.id());
        b.iter(|| {
            adapter.handle_remote_callback(RemoteEvent::StateChange, black_box(&playing));
            adapter.handle_remote_callback(RemoteEvent::StateChange, black_box(&paused));
        });
    });

    group.finish();
}

// ============================================================================
// Timer Benchmarks
// ============================================================================

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Clock Advance");

    for &seconds in &[1u64, 10, 60] {
        group.bench_with_input(
            BenchmarkId::new("advance_playing", seconds),
            &seconds,
            |b, &seconds| {
                let sim = SimulatedPlayer::new();
                sim.set_duration(600.0);
                sim.set_current_time(30.0);
                let mut adapter = loaded_adapter(&sim);
                adapter.apply_remote_state_change(PlayerState::Playing);
                b.iter(|| {
                    adapter.advance(black_box(Duration::from_secs(seconds)));
                    sim.clear_commands();
                });
            },
        );
    }

    group.bench_function("next_due", |b| {
        let mut timers = PollingTimers::new();
        timers.start(PollPurpose::Buffering, Duration::ZERO, Duration::from_millis(250));
        timers.start(PollPurpose::Playback, Duration::ZERO, Duration::from_millis(1000));
        b.iter(|| black_box(timers.next_due(black_box(Duration::from_secs(1)))));
    });

    group.bench_function("tick_functions", |b| {
        b.iter(|| {
            black_box(buffering_tick(black_box(PlayerState::Buffering), black_box(40)));
            black_box(playback_tick(black_box(PlayerState::Playing), black_box(Some(40))));
        });
    });

    group.finish();
}

// ============================================================================
// Event Bus Benchmarks
// ============================================================================

fn bench_event_bus(c: &mut Criterion) {
    let mut group = c.benchmark_group("Event Bus");

    for &subscribers in &[1usize, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("publish", subscribers),
            &subscribers,
            |b, &subscribers| {
                let mut bus = EventBus::new();
                for (i, kind) in EventKind::ALL.iter().cycle().take(subscribers).enumerate() {
                    if i % 2 == 0 {
                        bus.subscribe(*kind, |event| {
                            black_box(event);
                        });
                    } else {
                        bus.subscribe_all(|event| {
                            black_box(event);
                        });
                    }
                }
                let event = PlayerEvent::Progress { percent: 42 };
                b.iter(|| bus.publish(black_box(&event)));
            },
        );
    }

    group.bench_function("percent", |b| {
        b.iter(|| black_box(percent(black_box(333.0), black_box(1000.0))));
    });

    group.finish();
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(
    machine_benches,
    bench_state_changes,
);

criterion_group!(
    timer_benches,
    bench_advance,
);

criterion_group!(
    event_benches,
    bench_event_bus,
);

criterion_main!(
    machine_benches,
    timer_benches,
    event_benches,
);
