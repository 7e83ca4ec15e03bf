//! Readiness handshake
//!
//! The player host announces every initialized player through one shared
//! readiness slot, passing an opaque player id. [`ReadinessRegistry`] is that
//! slot made explicit: per-instance handlers keyed by player id, plus an
//! optional foreign handler that was installed before any adapter and must
//! keep running.

use crate::{
    adapter::PlayerAdapter,
    events::PlayerEvent,
    remote::{RemoteCommand, RemoteEvent},
    types::PlayerState,
    Error, Result,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info, instrument, trace, warn};

/// Readiness callback, receives the player id
pub type ReadyCallback = Box<dyn FnMut(&str)>;

/// Readiness slot shared by every adapter of a host
#[derive(Default)]
pub struct ReadinessRegistry {
    /// Handler that owned the slot before us, always called first
    foreign: Option<ReadyCallback>,
    /// Adapter handlers, in registration order
    instances: Vec<(String, ReadyCallback)>,
}

impl ReadinessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose slot already held `callback`
    pub fn with_foreign<F>(callback: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        let mut registry = Self::new();
        registry.install_foreign(callback);
        registry
    }

    /// Install a foreign handler. An existing one is wrapped, not replaced:
    /// the older handler keeps running first.
    pub fn install_foreign<F>(&mut self, mut callback: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.foreign = Some(match self.foreign.take() {
            Some(mut previous) => Box::new(move |player_id: &str| {
                previous(player_id);
                callback(player_id);
            }) as ReadyCallback,
            None => Box::new(callback) as ReadyCallback,
        });
    }

    pub fn has_foreign(&self) -> bool {
        self.foreign.is_some()
    }

    /// Register the handler of one adapter instance
    pub fn register<F>(&mut self, player_id: impl Into<String>, callback: F) -> Result<()>
    where
        F: FnMut(&str) + 'static,
    {
        let player_id = player_id.into();
        if self.is_registered(&player_id) {
            return Err(Error::DuplicateInstance { player_id });
        }
        debug!(player_id = %player_id, "Readiness handler registered");
        self.instances.push((player_id, Box::new(callback)));
        Ok(())
    }

    /// Remove an instance handler. Returns false if none was registered.
    pub fn unregister(&mut self, player_id: &str) -> bool {
        let before = self.instances.len();
        self.instances.retain(|(id, _)| id != player_id);
        self.instances.len() != before
    }

    pub fn is_registered(&self, player_id: &str) -> bool {
        self.instances.iter().any(|(id, _)| id == player_id)
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Announce that `player_id` is ready.
    ///
    /// The foreign handler runs first; a panic inside it is logged and does not
    /// keep the instance handler from running. Returns true if an instance
    /// handler matched.
    pub fn notify_ready(&mut self, player_id: &str) -> bool {
        if let Some(foreign) = self.foreign.as_mut() {
            if catch_unwind(AssertUnwindSafe(|| foreign(player_id))).is_err() {
                warn!(player_id = player_id, "Foreign readiness handler panicked");
            }
        }

        match self.instances.iter_mut().find(|(id, _)| id == player_id) {
            Some((_, callback)) => {
                callback(player_id);
                true
            }
            None => {
                trace!(player_id = player_id, "No adapter for player");
                false
            }
        }
    }
}

impl std::fmt::Debug for ReadinessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessRegistry")
            .field("foreign", &self.foreign.is_some())
            .field(
                "instances",
                &self.instances.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PlayerAdapter {
    /// Handshake with the embedded player.
    ///
    /// Ids of other players are ignored. For our own player:
    /// 1. leave `NotLoaded` (`StateChange(PlayerLoaded, NotLoaded)`)
    /// 2. register the state-change and error listeners
    /// 3. reconcile with the state the player reports
    /// 4. cue the configured video (or start it with `auto_start`)
    /// 5. emit `Ready`
    #[instrument(skip(self))]
    pub fn on_external_player_ready(&mut self, player_id: &str) {
        if player_id != self.player_id() {
            trace!("Readiness for another player");
            return;
        }
        if self.handshake_done {
            warn!("Repeated readiness for an initialized player ignored");
            return;
        }
        self.handshake_done = true;

        if self.state == PlayerState::NotLoaded {
            self.state = PlayerState::PlayerLoaded;
            self.emit(PlayerEvent::StateChange {
                new_state: PlayerState::PlayerLoaded,
                previous: PlayerState::NotLoaded,
            });
        }

        for event in [RemoteEvent::StateChange, RemoteEvent::Error] {
            let callback = self.callback_name(event);
            self.send(RemoteCommand::AddEventListener { event, callback });
        }

        let reported = self.send(RemoteCommand::GetPlayerState).as_code();
        match reported.and_then(PlayerState::from_native_code) {
            Some(state) if state != self.state => self.apply_remote_state_change(state),
            Some(_) => {}
            None => warn!(reported = ?reported, "Player reported no usable state"),
        }

        if let Some(pending) = self.pending.clone() {
            if self.config.auto_start {
                self.emit(PlayerEvent::Loading);
                self.send(RemoteCommand::LoadVideoById {
                    video_id: pending.video_id,
                    start_seconds: pending.start_seconds,
                });
            } else {
                self.cue(pending.start_seconds);
            }
        }

        info!(player_id = player_id, state = %self.state, "Player ready");
        self.emit(PlayerEvent::Ready);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedPlayer;
    use crate::types::PlayerConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> Box<dyn FnMut(&str)>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let make = move |label: &'static str| {
            let sink = sink.clone();
            Box::new(move |id: &str| sink.borrow_mut().push(format!("{}:{}", label, id)))
                as Box<dyn FnMut(&str)>
        };
        (calls, make)
    }

    #[test]
    fn test_foreign_runs_first() {
        let (calls, make) = recorder();
        let mut registry = ReadinessRegistry::with_foreign(make("foreign"));
        registry.register("p1", make("adapter")).unwrap();

        assert!(registry.notify_ready("p1"));
        assert_eq!(*calls.borrow(), vec!["foreign:p1", "adapter:p1"]);
    }

    #[test]
    fn test_foreign_sees_every_player() {
        let (calls, make) = recorder();
        let mut registry = ReadinessRegistry::with_foreign(make("foreign"));
        registry.register("p1", make("one")).unwrap();
        registry.register("p2", make("two")).unwrap();

        assert!(!registry.notify_ready("p3"));
        assert!(registry.notify_ready("p2"));
        assert_eq!(*calls.borrow(), vec!["foreign:p3", "foreign:p2", "two:p2"]);
    }

    #[test]
    fn test_install_foreign_chains() {
        let (calls, make) = recorder();
        let mut registry = ReadinessRegistry::new();
        assert!(!registry.has_foreign());
        registry.install_foreign(make("old"));
        registry.install_foreign(make("new"));
        assert!(registry.has_foreign());

        registry.notify_ready("p1");
        assert_eq!(*calls.borrow(), vec!["old:p1", "new:p1"]);
    }

    #[test]
    fn test_foreign_panic_does_not_block_adapter() {
        let (calls, make) = recorder();
        let mut registry = ReadinessRegistry::with_foreign(|_| panic!("foreign handler failed"));
        registry.register("p1", make("adapter")).unwrap();

        assert!(registry.notify_ready("p1"));
        assert_eq!(*calls.borrow(), vec!["adapter:p1"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ReadinessRegistry::new();
        registry.register("p1", |_| {}).unwrap();
        let err = registry.register("p1", |_| {}).unwrap_err();
        assert_eq!(registry.len(), 1);

        assert!(matches!(err, Error::DuplicateInstance { .. }));
        assert!(registry.unregister("p1"));
        assert!(!registry.unregister("p1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handshake_ignores_foreign_ids() {
        let sim = SimulatedPlayer::new();
        let mut adapter = PlayerAdapter::new("box", PlayerConfig::default(), sim.clone()).unwrap();

        adapter.on_external_player_ready("cueplay_other_player");

        assert_eq!(adapter.state(), PlayerState::NotLoaded);
        assert!(!adapter.is_ready());
        assert!(sim.commands().is_empty());
    }

    #[test]
    fn test_handshake_registers_listeners_and_reconciles() {
        let sim = SimulatedPlayer::new();
        sim.set_state(PlayerState::Paused);
        let mut adapter = PlayerAdapter::new("box", PlayerConfig::default(), sim.clone()).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        adapter.on_any(move |event| sink.borrow_mut().push(event.clone()));

        let id = adapter.player_id();
        adapter.on_external_player_ready(&id);

        assert_eq!(
            *log.borrow(),
            vec![
                PlayerEvent::StateChange {
                    new_state: PlayerState::PlayerLoaded,
                    previous: PlayerState::NotLoaded,
                },
                PlayerEvent::Paused,
                PlayerEvent::StateChange {
                    new_state: PlayerState::Paused,
                    previous: PlayerState::PlayerLoaded,
                },
                PlayerEvent::Ready,
            ]
        );
        assert_eq!(
            sim.listener(RemoteEvent::StateChange).as_deref(),
            Some("cueplay_box_onStateChange")
        );
        assert_eq!(sim.listener(RemoteEvent::Error).as_deref(), Some("cueplay_box_onError"));
        assert_eq!(sim.count("cueVideoById"), 0);
    }

    #[test]
    fn test_handshake_cues_configured_video() {
        let sim = SimulatedPlayer::new();
        let mut adapter = PlayerAdapter::new("box", PlayerConfig::with_video("abc"), sim.clone()).unwrap();

        let id = adapter.player_id();
        adapter.on_external_player_ready(&id);

        assert_eq!(
            sim.commands().last(),
            Some(&RemoteCommand::CueVideoById {
                video_id: "abc".to_string(),
                start_seconds: None,
            })
        );
    }

    #[test]
    fn test_handshake_auto_start() {
        let sim = SimulatedPlayer::new();
        let config = PlayerConfig {
            auto_start: true,
            ..PlayerConfig::with_video("abc")
        };
        let mut adapter = PlayerAdapter::new("box", config, sim.clone()).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        adapter.on_any(move |event| sink.borrow_mut().push(event.clone()));

        let id = adapter.player_id();
        adapter.on_external_player_ready(&id);

        assert_eq!(sim.count("loadVideoById"), 1);
        assert_eq!(sim.count("cueVideoById"), 0);
        let events = log.borrow();
        assert_eq!(events[events.len() - 2], PlayerEvent::Loading);
        assert_eq!(events[events.len() - 1], PlayerEvent::Ready);
    }

    #[test]
    fn test_repeated_handshake_ignored() {
        let sim = SimulatedPlayer::new();
        let mut adapter = PlayerAdapter::new("box", PlayerConfig::default(), sim.clone()).unwrap();
        let id = adapter.player_id();

        adapter.on_external_player_ready(&id);
        let sent = sim.commands().len();
        adapter.on_external_player_ready(&id);

        assert_eq!(sim.commands().len(), sent);
        assert_eq!(sim.count("addEventListener"), 2);
    }
}
