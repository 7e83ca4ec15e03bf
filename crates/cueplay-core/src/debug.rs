//! Debug observer
//!
//! Subscribes to a set of event kinds on an [`EventBus`] and logs every
//! occurrence under a debug key. The most recent occurrences are also kept as
//! timestamped records for inspection.

use crate::{
    events::{EventBus, EventKind, PlayerEvent, SubscriptionId},
    Error, Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::info;

/// Records kept by default
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// Observer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DebugConfig {
    /// Label attached to every log line
    pub debug_key: String,
    /// Kinds to observe
    pub debug_events: Vec<EventKind>,
    /// Records kept before the oldest are dropped
    pub history_limit: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            debug_key: "CueplayDebugPlayer".to_string(),
            debug_events: EventKind::ALL.to_vec(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl DebugConfig {
    /// Build from event names (`Play` or `onPlay`). Unknown names are rejected.
    pub fn from_names<S: AsRef<str>>(debug_key: impl Into<String>, names: &[S]) -> Result<Self> {
        let debug_events = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                EventKind::from_name(name).ok_or_else(|| {
                    Error::InvalidConfig(format!("no handler for debug event '{}'", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            debug_key: debug_key.into(),
            debug_events,
            history_limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }
}

/// One observed event
#[derive(Debug, Clone, Serialize)]
pub struct DebugRecord {
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
    pub key: String,
    #[serde(flatten)]
    pub event: PlayerEvent,
}

#[derive(Debug)]
struct History {
    sequence: u64,
    limit: usize,
    records: VecDeque<DebugRecord>,
}

impl History {
    fn new(limit: usize) -> Self {
        Self {
            sequence: 0,
            limit,
            records: VecDeque::new(),
        }
    }

    fn record(&mut self, key: &str, event: &PlayerEvent) {
        self.sequence += 1;
        if self.limit == 0 {
            return;
        }
        if self.records.len() == self.limit {
            self.records.pop_front();
        }
        self.records.push_back(DebugRecord {
            timestamp: Utc::now(),
            sequence: self.sequence,
            key: key.to_string(),
            event: event.clone(),
        });
    }
}

/// Logs events from a bus
#[derive(Debug, Clone)]
pub struct DebugObserver {
    key: String,
    history: Rc<RefCell<History>>,
    subscriptions: Vec<SubscriptionId>,
}

impl DebugObserver {
    /// Subscribe to every configured kind. Each kind is observed once even if listed twice.
    ///
    /// Only the last `history_limit` records are kept; sequence numbers keep
    /// counting past dropped ones.
    pub fn attach(bus: &mut EventBus, config: DebugConfig) -> Self {
        let history = Rc::new(RefCell::new(History::new(config.history_limit)));
        let mut kinds = Vec::with_capacity(config.debug_events.len());
        for kind in config.debug_events {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        let subscriptions = kinds
            .into_iter()
            .map(|kind| {
                let history = history.clone();
                let key = config.debug_key.clone();
                bus.subscribe(kind, move |event| {
                    info!(debug_key = %key, event = %event, "Player event");
                    history.borrow_mut().record(&key, event);
                })
            })
            .collect();

        Self {
            key: config.debug_key,
            history,
            subscriptions,
        }
    }

    /// Remove every subscription from `bus`
    pub fn detach(&self, bus: &mut EventBus) {
        for id in &self.subscriptions {
            bus.unsubscribe(*id);
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Kept records, oldest first
    pub fn records(&self) -> Vec<DebugRecord> {
        self.history.borrow().records.iter().cloned().collect()
    }

    /// Observed events, oldest first
    pub fn events(&self) -> Vec<PlayerEvent> {
        self.history
            .borrow()
            .records
            .iter()
            .map(|record| record.event.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.history.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.history.borrow_mut().records.clear();
    }
}
