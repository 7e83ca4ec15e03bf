//! cueplay core - embedded video player adapter
//!
//! Turns the asynchronous, poll-unfriendly interface of an embedded video
//! player into a finite-state model with semantic events:
//! - One-time readiness handshake, composable with foreign readiness handlers
//! - Translation of native state and error codes into lifecycle events
//! - Synthetic `Buffered` / `Progress` events derived by polling
//! - Polling timers on a virtual clock, at most one per purpose
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        cueplay core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐   ready / state / error   ┌──────────────┐    │
//! │  │ Remote Player│ ─────────────────────────▶│  Player Host │    │
//! │  │    Handle    │                           │  (registry)  │    │
//! │  └──────▲───────┘                           └──────┬───────┘    │
//! │         │ commands                                 │            │
//! │  ┌──────┴──────────────────────────────────────────▼───────┐    │
//! │  │                    Player Adapter                       │    │
//! │  │  readiness handshake · state machine · polling timers   │    │
//! │  └───────────────────────────┬─────────────────────────────┘    │
//! │                              │                                  │
//! │                       ┌──────▼──────┐     ┌──────────────┐      │
//! │                       │  Event Bus  │────▶│    Debug     │      │
//! │                       └─────────────┘     │   Observer   │      │
//! │                                           └──────────────┘      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cueplay_core::{EventKind, PlayerConfig, PlayerHost, PlayerState, SimulatedPlayer};
//!
//! let mut host = PlayerHost::new();
//! let sim = SimulatedPlayer::new();
//! let player = host.mount("player_div", PlayerConfig::with_video("AJSWEHNCBDE"), sim.clone())?;
//! player.borrow_mut().on(EventKind::Ready, |_| println!("ready"));
//!
//! let id = player.borrow().player_id();
//! host.player_ready(&id);
//! sim.emit_state(&mut host, PlayerState::Cueing);
//!
//! player.borrow_mut().play(None);
//! assert_eq!(sim.count("playVideo"), 1);
//! # Ok::<(), cueplay_core::Error>(())
//! ```

pub mod error;
pub mod types;
pub mod remote;
pub mod events;
pub mod timers;
pub mod adapter;
pub mod machine;
pub mod readiness;
pub mod host;
pub mod sim;
pub mod debug;

pub use error::{Error, Result};
pub use types::*;
pub use remote::{RemoteCommand, RemoteEvent, RemotePlayer, RemoteValue};
pub use events::{EventBus, EventKind, PlayerEvent, SubscriptionId};
pub use timers::{PollPurpose, PollingTimer, PollingTimers, TickOutcome};
pub use adapter::PlayerAdapter;
pub use readiness::ReadinessRegistry;
pub use host::{drive, PlayerHost, SharedAdapter};
pub use sim::SimulatedPlayer;
pub use debug::{DebugConfig, DebugObserver, DebugRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "cueplay core initialized");
}
