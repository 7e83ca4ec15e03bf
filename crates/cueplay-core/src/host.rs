//! Player host
//!
//! The environment embedded players live in: one readiness slot shared by all
//! adapters, and named callback slots the players are told to call for state
//! changes and errors. [`PlayerHost::mount`] wires an adapter into both.
//!
//! Host callbacks run the adapter through [`drive`]: events are queued while
//! the adapter is borrowed and handed to handlers once it is released, so a
//! handler can issue commands on the shared adapter it captured.

use crate::{
    adapter::PlayerAdapter,
    readiness::ReadinessRegistry,
    remote::{RemoteEvent, RemotePlayer, RemoteValue},
    types::PlayerConfig,
    Error, Result,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument, warn};

/// Adapter shared between the application and host callbacks
pub type SharedAdapter = Rc<RefCell<PlayerAdapter>>;

/// Named host callback
pub type HostCallback = Box<dyn FnMut(&RemoteValue)>;

/// Host environment for embedded players
#[derive(Default)]
pub struct PlayerHost {
    readiness: ReadinessRegistry,
    callbacks: HashMap<String, HostCallback>,
}

impl PlayerHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose readiness slot is already in use
    pub fn with_readiness(readiness: ReadinessRegistry) -> Self {
        Self {
            readiness,
            callbacks: HashMap::new(),
        }
    }

    pub fn readiness_mut(&mut self) -> &mut ReadinessRegistry {
        &mut self.readiness
    }

    /// Create an adapter for `target` and register its readiness, state-change
    /// and error callbacks.
    ///
    /// Callbacks only hold weak references: dropping every [`SharedAdapter`]
    /// turns them into no-ops.
    #[instrument(skip(self, config, remote))]
    pub fn mount<R>(&mut self, target: &str, config: PlayerConfig, remote: R) -> Result<SharedAdapter>
    where
        R: RemotePlayer + 'static,
    {
        let adapter = PlayerAdapter::new(target, config, remote)?;
        let player_id = adapter.player_id();
        if self.readiness.is_registered(&player_id) {
            return Err(Error::DuplicateInstance { player_id });
        }

        let callback_names = [RemoteEvent::StateChange, RemoteEvent::Error]
            .map(|event| (event, adapter.callback_name(event)));

        let shared = Rc::new(RefCell::new(adapter));

        let weak = Rc::downgrade(&shared);
        self.readiness.register(player_id.clone(), move |id: &str| {
            with_adapter(&weak, |adapter| adapter.on_external_player_ready(id));
        })?;

        for (event, name) in callback_names {
            let weak = Rc::downgrade(&shared);
            self.callbacks.insert(
                name,
                Box::new(move |value: &RemoteValue| {
                    with_adapter(&weak, |adapter| adapter.handle_remote_callback(event, value));
                }),
            );
        }

        info!(player_id = %player_id, "Player mounted");
        Ok(shared)
    }

    /// Remove every callback of `adapter`. Returns false if it was not mounted.
    pub fn unmount(&mut self, adapter: &PlayerAdapter) -> bool {
        let removed = self.readiness.unregister(&adapter.player_id());
        for event in [RemoteEvent::StateChange, RemoteEvent::Error] {
            self.callbacks.remove(&adapter.callback_name(event));
        }
        if removed {
            info!(player_id = %adapter.player_id(), "Player unmounted");
        }
        removed
    }

    /// Deliver the readiness notification for `player_id`
    pub fn player_ready(&mut self, player_id: &str) -> bool {
        self.readiness.notify_ready(player_id)
    }

    /// Call the named callback
    pub fn dispatch(&mut self, callback: &str, value: RemoteValue) -> Result<()> {
        let Some(handler) = self.callbacks.get_mut(callback) else {
            warn!(callback = callback, "Dispatch to unknown callback");
            return Err(Error::UnknownCallback(callback.to_string()));
        };
        debug!(callback = callback, value = ?value, "Host callback");
        handler(&value);
        Ok(())
    }

    pub fn has_callback(&self, callback: &str) -> bool {
        self.callbacks.contains_key(callback)
    }
}

fn with_adapter(weak: &Weak<RefCell<PlayerAdapter>>, f: impl FnOnce(&mut PlayerAdapter)) {
    match weak.upgrade() {
        Some(adapter) => drive(&adapter, f),
        None => debug!("Callback for a dropped adapter"),
    }
}

/// Run `f` on the adapter, then deliver the events it raised with the adapter
/// released.
///
/// Handlers may borrow `adapter` again. Events they raise are queued behind
/// the current ones and delivered by the same call. A nested `drive` from a
/// handler leaves delivery to the outer one.
pub fn drive<T>(adapter: &SharedAdapter, f: impl FnOnce(&mut PlayerAdapter) -> T) -> T {
    let mut inner = adapter.borrow_mut();
    if !inner.begin_deferred() {
        return f(&mut inner);
    }
    drop(inner);

    let _delivery = Delivery(adapter);
    let output = f(&mut adapter.borrow_mut());
    deliver_deferred(adapter);
    output
}

/// Ends deferred mode once delivery is over, even if a handler unwinds
struct Delivery<'a>(&'a SharedAdapter);

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        if let Ok(mut adapter) = self.0.try_borrow_mut() {
            adapter.end_deferred();
        }
    }
}

fn deliver_deferred(adapter: &SharedAdapter) {
    loop {
        let next = adapter.borrow_mut().next_deferred();
        let Some((event, handlers)) = next else {
            break;
        };
        for handler in handlers {
            (handler.borrow_mut())(&event);
        }
    }
}

impl std::fmt::Debug for PlayerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHost")
            .field("readiness", &self.readiness)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, PlayerEvent};
    use crate::remote::RemoteCommand;
    use crate::sim::SimulatedPlayer;
    use crate::types::PlayerState;

    #[test]
    fn test_mount_registers_callbacks() {
        let mut host = PlayerHost::new();
        let adapter = host
            .mount("box", PlayerConfig::default(), SimulatedPlayer::new())
            .unwrap();

        assert!(host.has_callback("cueplay_box_onStateChange"));
        assert!(host.has_callback("cueplay_box_onError"));
        assert!(host.readiness_mut().is_registered(&adapter.borrow().player_id()));
    }

    #[test]
    fn test_mount_same_target_twice() {
        let mut host = PlayerHost::new();
        host.mount("box", PlayerConfig::default(), SimulatedPlayer::new())
            .unwrap();
        let err = host
            .mount("box", PlayerConfig::default(), SimulatedPlayer::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateInstance { .. }));
    }

    #[test]
    fn test_mount_rejects_bad_target() {
        let mut host = PlayerHost::new();
        let err = host
            .mount("#box", PlayerConfig::default(), SimulatedPlayer::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(_)));
        assert!(host.readiness_mut().is_empty());
    }

    #[test]
    fn test_dispatch_reaches_adapter() {
        let mut host = PlayerHost::new();
        let sim = SimulatedPlayer::new();
        let adapter = host.mount("box", PlayerConfig::default(), sim.clone()).unwrap();

        let id = adapter.borrow().player_id();
        assert!(host.player_ready(&id));
        assert!(sim.emit_state(&mut host, PlayerState::Paused));

        assert_eq!(adapter.borrow().state(), PlayerState::Paused);
        assert!(host.dispatch("cueplay_nope_onError", RemoteValue::from(100)).is_err());
    }

    #[test]
    fn test_unmount_and_dropped_adapter() {
        let mut host = PlayerHost::new();
        let adapter = host
            .mount("box", PlayerConfig::default(), SimulatedPlayer::new())
            .unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        adapter.borrow_mut().on_any(move |event: &PlayerEvent| sink.borrow_mut().push(event.clone()));

        let id = adapter.borrow().player_id();
        assert!(host.unmount(&adapter.borrow()));
        assert!(!host.player_ready(&id));
        assert!(seen.borrow().is_empty());

        let other = host
            .mount("other", PlayerConfig::default(), SimulatedPlayer::new())
            .unwrap();
        let other_id = other.borrow().player_id();
        drop(other);
        // handler still registered, adapter gone
        assert!(host.player_ready(&other_id));
    }

    #[test]
    fn test_handler_commands_shared_adapter() {
        let mut host = PlayerHost::new();
        let sim = SimulatedPlayer::new();
        let adapter = host.mount("box", PlayerConfig::with_video("abc"), sim.clone()).unwrap();

        let shared = Rc::downgrade(&adapter);
        adapter.borrow_mut().on(EventKind::Ready, move |_| {
            if let Some(adapter) = shared.upgrade() {
                adapter.borrow_mut().play_video("next", Some(3.0));
            }
        });

        let id = adapter.borrow().player_id();
        assert!(host.player_ready(&id));

        assert_eq!(
            sim.actions().last(),
            Some(&RemoteCommand::LoadVideoById {
                video_id: "next".to_string(),
                start_seconds: Some(3.0),
            })
        );
        assert_eq!(adapter.borrow().pending_request().unwrap().video_id, "next");
    }

    #[test]
    fn test_drive_delivers_after_release() {
        let sim = SimulatedPlayer::new();
        let adapter: SharedAdapter = Rc::new(RefCell::new(
            PlayerAdapter::new("box", PlayerConfig::with_video("abc"), sim.clone()).unwrap(),
        ));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (sink, shared) = (seen.clone(), adapter.clone());
        adapter.borrow_mut().on_any(move |event: &PlayerEvent| {
            // the adapter is free while handlers run
            sink.borrow_mut().push((event.clone(), shared.try_borrow_mut().is_ok()));
        });

        let state = drive(&adapter, |adapter| {
            adapter.apply_remote_state_change(PlayerState::Paused);
            adapter.state()
        });

        assert_eq!(state, PlayerState::Paused);
        assert_eq!(seen.borrow().len(), 2);
        assert!(seen.borrow().iter().all(|(_, free)| *free));

        // direct calls publish right away
        adapter.borrow_mut().apply_remote_state_change(PlayerState::Playing);
        assert_eq!(seen.borrow().len(), 4);
        assert!(!seen.borrow()[2].1);
    }
}
