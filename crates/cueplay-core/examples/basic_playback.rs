//! Basic playback example
//!
//! Mounts an adapter on a simulated player, runs the readiness handshake and
//! walks through cue, play, progress polling and an embedding error.
//!
//! Run with: cargo run -p cueplay-core --example basic_playback

use cueplay_core::{
    DebugConfig, DebugObserver, EventKind, PlayerConfig, PlayerHost, PlayerState, SimulatedPlayer,
};
use std::time::Duration;

fn main() -> cueplay_core::Result<()> {
    println!("cueplay - Basic Playback Example");
    println!("===============================\n");

    let mut host = PlayerHost::new();
    let sim = SimulatedPlayer::new();
    let player = host.mount("player_div", PlayerConfig::with_video("AJSWEHNCBDE"), sim.clone())?;

    player.borrow_mut().on(EventKind::Progress, |event| println!("  progress: {}", event));
    let observer = DebugObserver::attach(
        player.borrow_mut().events_mut(),
        DebugConfig::from_names("example", &["Ready", "Start", "Play", "Error", "NotAllowed"])?,
    );

    println!("Handshake:");
    let id = player.borrow().player_id();
    host.player_ready(&id);
    println!("  state: {}", player.borrow().state_name());

    println!("\nPlayback:");
    sim.emit_state(&mut host, PlayerState::Cueing);
    player.borrow_mut().play(None);
    sim.set_duration(212.0);
    sim.set_current_time(0.0);
    sim.emit_state(&mut host, PlayerState::Playing);
    for second in 1..=3 {
        sim.set_current_time(f64::from(second) * 30.0);
        player.borrow_mut().advance(Duration::from_secs(1));
    }

    println!("\nEmbedding refused:");
    sim.emit_error(&mut host, 150);

    println!("\nCommands sent to the player:");
    for command in sim.actions() {
        println!("  {}", command);
    }

    println!("\nObserved events:");
    for record in observer.records() {
        println!("  #{} {}", record.sequence, record.event);
    }

    Ok(())
}
