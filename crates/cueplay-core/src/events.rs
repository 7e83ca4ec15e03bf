//! Event bus
//!
//! Lifecycle events are a closed enum with typed payloads. Subscribers are kept
//! in one ordered table: delivery is synchronous, in registration order.
//! Events raised under [`crate::host::drive`] are delivered once the adapter is
//! released, so handlers may call back into it.

use crate::types::PlayerState;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;
use uuid::Uuid;

/// Events emitted by the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Emitted last for every state change
    StateChange {
        new_state: PlayerState,
        previous: PlayerState,
    },
    /// Handshake finished, the player accepts commands
    Ready,
    Unstarted,
    /// Playback started from `Unstarted` or `Ended` (not a resume)
    Start,
    Play,
    Paused,
    Buffering,
    /// Video fully buffered
    Buffered,
    Cueing,
    Ended,
    /// A video load was requested
    Loading,
    /// Player error, always emitted after `NotFound` / `NotAllowed`
    Error { code: i32 },
    NotFound,
    NotAllowed,
    /// Share of the duration already played, sampled while playing
    Progress { percent: u32 },
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::StateChange { .. } => EventKind::StateChange,
            PlayerEvent::Ready => EventKind::Ready,
            PlayerEvent::Unstarted => EventKind::Unstarted,
            PlayerEvent::Start => EventKind::Start,
            PlayerEvent::Play => EventKind::Play,
            PlayerEvent::Paused => EventKind::Paused,
            PlayerEvent::Buffering => EventKind::Buffering,
            PlayerEvent::Buffered => EventKind::Buffered,
            PlayerEvent::Cueing => EventKind::Cueing,
            PlayerEvent::Ended => EventKind::Ended,
            PlayerEvent::Loading => EventKind::Loading,
            PlayerEvent::Error { .. } => EventKind::Error,
            PlayerEvent::NotFound => EventKind::NotFound,
            PlayerEvent::NotAllowed => EventKind::NotAllowed,
            PlayerEvent::Progress { .. } => EventKind::Progress,
        }
    }

    /// Semantic event for a state entered through the remote
    pub fn for_state(state: PlayerState) -> Option<PlayerEvent> {
        match state {
            PlayerState::Unstarted => Some(PlayerEvent::Unstarted),
            PlayerState::Ended => Some(PlayerEvent::Ended),
            PlayerState::Playing => Some(PlayerEvent::Play),
            PlayerState::Paused => Some(PlayerEvent::Paused),
            PlayerState::Buffering => Some(PlayerEvent::Buffering),
            PlayerState::Cueing => Some(PlayerEvent::Cueing),
            PlayerState::NotLoaded | PlayerState::PlayerLoaded => None,
        }
    }
}

impl std::fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerEvent::StateChange { new_state, previous } => {
                write!(f, "{}({}, {})", self.kind(), new_state, previous)
            }
            PlayerEvent::Error { code } => write!(f, "{}({})", self.kind(), code),
            PlayerEvent::Progress { percent } => write!(f, "{}({}%)", self.kind(), percent),
            _ => write!(f, "{}", self.kind()),
        }
    }
}

/// Payload-free discriminant of [`PlayerEvent`], used as subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    StateChange,
    Ready,
    Unstarted,
    Start,
    Play,
    Paused,
    Buffering,
    Buffered,
    Cueing,
    Ended,
    Loading,
    Error,
    NotFound,
    NotAllowed,
    Progress,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        EventKind::StateChange,
        EventKind::Ready,
        EventKind::Unstarted,
        EventKind::Start,
        EventKind::Play,
        EventKind::Paused,
        EventKind::Buffering,
        EventKind::Buffered,
        EventKind::Cueing,
        EventKind::Ended,
        EventKind::Loading,
        EventKind::Error,
        EventKind::NotFound,
        EventKind::NotAllowed,
        EventKind::Progress,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::StateChange => "StateChange",
            EventKind::Ready => "Ready",
            EventKind::Unstarted => "Unstarted",
            EventKind::Start => "Start",
            EventKind::Play => "Play",
            EventKind::Paused => "Paused",
            EventKind::Buffering => "Buffering",
            EventKind::Buffered => "Buffered",
            EventKind::Cueing => "Cueing",
            EventKind::Ended => "Ended",
            EventKind::Loading => "Loading",
            EventKind::Error => "Error",
            EventKind::NotFound => "NotFound",
            EventKind::NotAllowed => "NotAllowed",
            EventKind::Progress => "Progress",
        }
    }

    /// Parse a kind by name, accepting the `on` prefixed handler form (`onPlay`)
    pub fn from_name(name: &str) -> Option<EventKind> {
        let name = name.strip_prefix("on").unwrap_or(name);
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event handler closure
pub type EventHandler = Box<dyn FnMut(&PlayerEvent)>;

/// Handler detached from its bus for deferred delivery
pub(crate) type SharedHandler = Rc<RefCell<EventHandler>>;

struct Subscription {
    id: SubscriptionId,
    /// `None` receives every event
    filter: Option<EventKind>,
    handler: SharedHandler,
}

impl Subscription {
    fn matches(&self, kind: EventKind) -> bool {
        self.filter.map_or(true, |filter| filter == kind)
    }
}

/// Ordered publish/subscribe table
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for one event kind
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + 'static,
    {
        self.push(Some(kind), Box::new(handler))
    }

    /// Register `handler` for every event
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&PlayerEvent) + 'static,
    {
        self.push(None, Box::new(handler))
    }

    fn push(&mut self, filter: Option<EventKind>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscriptions.push(Subscription {
            id,
            filter,
            handler: Rc::new(RefCell::new(handler)),
        });
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver `event` to every matching handler, in registration order
    pub fn publish(&mut self, event: &PlayerEvent) {
        trace!(event = %event, "Publishing event");
        for handler in self.handlers_for(event) {
            (handler.borrow_mut())(event);
        }
    }

    /// Handlers `event` goes to, in registration order. Later changes to the
    /// table do not affect the returned list.
    pub(crate) fn handlers_for(&self, event: &PlayerEvent) -> Vec<SharedHandler> {
        let kind = event.kind();
        self.subscriptions
            .iter()
            .filter(|sub| sub.matches(kind))
            .map(|sub| sub.handler.clone())
            .collect()
    }

    /// Number of handlers that would receive an event of `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|sub| sub.matches(kind)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
