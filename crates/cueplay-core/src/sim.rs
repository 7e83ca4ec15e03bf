//! Simulated embedded player
//!
//! A [`RemotePlayer`] backed by plain values: getters answer from the values
//! set on it, commands are recorded, and state changes or errors are pushed
//! through the host callbacks the adapter registered. Cloning shares the same
//! player, so a test or driver keeps a handle while the adapter owns another.

use crate::{
    host::PlayerHost,
    remote::{RemoteCommand, RemoteEvent, RemotePlayer, RemoteValue},
    types::PlayerState,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug)]
struct SimState {
    state: i32,
    bytes_loaded: f64,
    bytes_total: f64,
    duration: f64,
    current_time: f64,
    embed_code: String,
    listeners: HashMap<RemoteEvent, String>,
    commands: Vec<RemoteCommand>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            state: PlayerState::Unstarted.id(),
            bytes_loaded: -1.0,
            bytes_total: -1.0,
            duration: -1.0,
            current_time: -1.0,
            embed_code: String::new(),
            listeners: HashMap::new(),
            commands: Vec::new(),
        }
    }
}

/// Shared handle to a simulated player
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlayer {
    inner: Rc<RefCell<SimState>>,
}

impl SimulatedPlayer {
    /// Player in `Unstarted` with every measurement unavailable
    pub fn new() -> Self {
        Self::default()
    }

    /// State returned by `getPlayerState`
    pub fn set_state(&self, state: PlayerState) {
        self.inner.borrow_mut().state = state.id();
    }

    pub fn set_bytes(&self, loaded: f64, total: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.bytes_loaded = loaded;
        inner.bytes_total = total;
    }

    pub fn set_duration(&self, seconds: f64) {
        self.inner.borrow_mut().duration = seconds;
    }

    pub fn set_current_time(&self, seconds: f64) {
        self.inner.borrow_mut().current_time = seconds;
    }

    pub fn set_embed_code(&self, code: &str) {
        self.inner.borrow_mut().embed_code = code.to_string();
    }

    /// Every command received so far, queries included
    pub fn commands(&self) -> Vec<RemoteCommand> {
        self.inner.borrow().commands.clone()
    }

    /// Commands received so far, queries excluded
    pub fn actions(&self) -> Vec<RemoteCommand> {
        self.inner
            .borrow()
            .commands
            .iter()
            .filter(|command| !command.is_query())
            .cloned()
            .collect()
    }

    /// Number of received commands with native name `name`
    pub fn count(&self, name: &str) -> usize {
        self.inner
            .borrow()
            .commands
            .iter()
            .filter(|command| command.name() == name)
            .count()
    }

    pub fn clear_commands(&self) {
        self.inner.borrow_mut().commands.clear();
    }

    /// Host callback registered for `event`
    pub fn listener(&self, event: RemoteEvent) -> Option<String> {
        self.inner.borrow().listeners.get(&event).cloned()
    }

    /// Change state and notify the registered state-change callback.
    /// Returns false if no listener is registered yet.
    pub fn emit_state(&self, host: &mut PlayerHost, state: PlayerState) -> bool {
        self.set_state(state);
        self.notify(host, RemoteEvent::StateChange, state.id())
    }

    /// Report an error code through the registered error callback
    pub fn emit_error(&self, host: &mut PlayerHost, code: i32) -> bool {
        self.notify(host, RemoteEvent::Error, code)
    }

    fn notify(&self, host: &mut PlayerHost, event: RemoteEvent, code: i32) -> bool {
        // release our borrow before the adapter calls back into us
        let Some(callback) = self.listener(event) else {
            debug!(event = event.name(), "No listener registered");
            return false;
        };
        host.dispatch(&callback, RemoteValue::from(code)).is_ok()
    }
}

impl RemotePlayer for SimulatedPlayer {
    fn remote(&mut self, command: RemoteCommand) -> RemoteValue {
        let mut inner = self.inner.borrow_mut();
        inner.commands.push(command.clone());

        match command {
            RemoteCommand::GetPlayerState => RemoteValue::from(inner.state),
            RemoteCommand::GetVideoBytesLoaded => RemoteValue::Number(inner.bytes_loaded),
            RemoteCommand::GetVideoBytesTotal => RemoteValue::Number(inner.bytes_total),
            RemoteCommand::GetDuration => RemoteValue::Number(inner.duration),
            RemoteCommand::GetCurrentTime => RemoteValue::Number(inner.current_time),
            RemoteCommand::GetVideoEmbedCode => RemoteValue::Text(inner.embed_code.clone()),
            RemoteCommand::AddEventListener { event, callback } => {
                inner.listeners.insert(event, callback);
                RemoteValue::Empty
            }
            _ => RemoteValue::Empty,
        }
    }
}
