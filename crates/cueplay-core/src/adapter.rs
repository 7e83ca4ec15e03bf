//! Player adapter - one instance per embedded player
//!
//! Owns:
//! - The tracked player state and the pending video request
//! - Both polling timer slots and the virtual clock driving them
//! - The remote player handle
//! - The event bus consumers subscribe to, and the queue of events held back
//!   while the adapter is borrowed by [`crate::host::drive`]
//!
//! The readiness handshake lives in [`crate::readiness`], state transitions,
//! commands and queries in [`crate::machine`].

use crate::{
    events::{EventBus, EventKind, PlayerEvent, SharedHandler, SubscriptionId},
    remote::{RemoteCommand, RemoteEvent, RemotePlayer, RemoteValue},
    timers::{PollPurpose, PollingTimers},
    types::*,
    Result,
};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Prefix of every identifier an adapter registers with its host
const ID_PREFIX: &str = "cueplay";

/// Adapter between the application and one embedded player
pub struct PlayerAdapter {
    /// Mount target, validated against `[0-9A-Za-z_]+`
    target: String,
    /// Prefix of the player id and callback names
    prefix: String,
    /// Adapter configuration
    pub(crate) config: PlayerConfig,
    /// Current player state
    pub(crate) state: PlayerState,
    /// Last requested video
    pub(crate) pending: Option<PendingVideoRequest>,
    /// Buffering and playback timers
    pub(crate) timers: PollingTimers,
    /// Virtual clock, advanced by the host
    pub(crate) clock: Duration,
    /// Set once the handshake for our player id went through
    pub(crate) handshake_done: bool,
    /// Embedded player handle
    remote: Box<dyn RemotePlayer>,
    /// Subscribers
    events: EventBus,
    /// Queue events instead of publishing them
    deferred: bool,
    /// Events waiting for deferred delivery
    outbox: VecDeque<PlayerEvent>,
}

impl PlayerAdapter {
    /// Create an adapter for the player mounted at `target`.
    ///
    /// Fails with [`crate::Error::InvalidTarget`] or [`crate::Error::InvalidConfig`]
    /// before anything is sent to the player.
    pub fn new<R>(target: &str, config: PlayerConfig, remote: R) -> Result<Self>
    where
        R: RemotePlayer + 'static,
    {
        validate_target(target)?;
        config.validate()?;

        let pending = config
            .video_id
            .clone()
            .map(|video_id| PendingVideoRequest::new(video_id, None));
        let prefix = format!("{}_{}_", ID_PREFIX, target);

        info!(mount = target, video_id = ?config.video_id, "Player adapter created");

        Ok(Self {
            target: target.to_string(),
            prefix,
            config,
            state: PlayerState::NotLoaded,
            pending,
            timers: PollingTimers::new(),
            clock: Duration::ZERO,
            handshake_done: false,
            remote: Box::new(remote),
            events: EventBus::new(),
            deferred: false,
            outbox: VecDeque::new(),
        })
    }

    /// Mount target
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Identifier the host passes to the readiness callback for our player
    pub fn player_id(&self) -> String {
        format!("{}player", self.prefix)
    }

    /// Host callback name the remote is told to call for `event`
    pub fn callback_name(&self, event: RemoteEvent) -> String {
        format!("{}{}", self.prefix, event.name())
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Last requested video, if any
    pub fn pending_request(&self) -> Option<&PendingVideoRequest> {
        self.pending.as_ref()
    }

    /// True once the handshake for this player has completed
    pub fn is_ready(&self) -> bool {
        self.handshake_done
    }

    /// Event bus, for subscriptions
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Subscribe to one event kind
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    /// Subscribe to every event
    pub fn on_any<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + 'static,
    {
        self.events.subscribe_all(handler)
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// True while a timer for `purpose` is running
    pub fn is_polling(&self, purpose: PollPurpose) -> bool {
        self.timers.is_active(purpose)
    }

    /// Number of running timers
    pub fn active_timers(&self) -> usize {
        self.timers.active_count()
    }

    /// Route a host callback registered through `AddEventListener`
    pub fn handle_remote_callback(&mut self, event: RemoteEvent, value: &RemoteValue) {
        let Some(code) = value.as_code() else {
            warn!(event = event.name(), value = ?value, "Ignoring callback without numeric payload");
            return;
        };

        match event {
            RemoteEvent::StateChange => match PlayerState::from_native_code(code) {
                Some(state) => self.apply_remote_state_change(state),
                None => warn!(code = code, "Ignoring unknown player state"),
            },
            RemoteEvent::Error => self.apply_remote_error(code),
        }
    }

    pub(crate) fn emit(&mut self, event: PlayerEvent) {
        debug!(mount = %self.target, event = %event, "Event");
        if self.deferred {
            self.outbox.push_back(event);
        } else {
            self.events.publish(&event);
        }
    }

    /// Start queueing events. Returns false if already queueing.
    pub(crate) fn begin_deferred(&mut self) -> bool {
        !std::mem::replace(&mut self.deferred, true)
    }

    /// Next queued event with the handlers it goes to
    pub(crate) fn next_deferred(&mut self) -> Option<(PlayerEvent, Vec<SharedHandler>)> {
        let event = self.outbox.pop_front()?;
        trace!(queued = self.outbox.len(), event = %event, "Deferred delivery");
        let handlers = self.events.handlers_for(&event);
        Some((event, handlers))
    }

    pub(crate) fn end_deferred(&mut self) {
        self.deferred = false;
    }

    pub(crate) fn send(&mut self, command: RemoteCommand) -> RemoteValue {
        if !command.is_query() {
            debug!(mount = %self.target, command = %command, "Remote command");
        }
        self.remote.remote(command)
    }
}

impl std::fmt::Debug for PlayerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerAdapter")
            .field("target", &self.target)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("timers", &self.timers)
            .field("clock", &self.clock)
            .field("events", &self.events)
            .field("queued", &self.outbox.len())
            .finish_non_exhaustive()
    }
}
