//! Polling timers
//!
//! The embedded player never reports buffering completion or playback
//! progress, so the adapter polls for them. Timers are plain owned values on a
//! virtual clock; the adapter advances the clock and runs the tick functions
//! below, which only look at their inputs.

use crate::events::PlayerEvent;
use crate::types::PlayerState;
use std::time::Duration;

/// What a timer polls for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollPurpose {
    /// Load percentage while buffering
    Buffering,
    /// Elapsed share of the duration while playing
    Playback,
}

impl std::fmt::Display for PollPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollPurpose::Buffering => write!(f, "buffering"),
            PollPurpose::Playback => write!(f, "playback"),
        }
    }
}

/// Repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingTimer {
    pub interval: Duration,
    /// Virtual time of the next tick
    pub next_fire: Duration,
}

impl PollingTimer {
    pub fn starting_at(now: Duration, interval: Duration) -> Self {
        Self {
            interval,
            next_fire: now + interval,
        }
    }

    /// Move to the following period
    pub fn reschedule(&mut self) {
        self.next_fire += self.interval;
    }
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    pub keep_running: bool,
    pub events: Vec<PlayerEvent>,
}

impl TickOutcome {
    fn keep() -> Self {
        Self {
            keep_running: true,
            events: Vec::new(),
        }
    }

    fn stop() -> Self {
        Self::default()
    }
}

/// Buffering tick: emit `Buffered` and stop at 100%, stop silently once the
/// player is neither playing nor buffering.
pub fn buffering_tick(state: PlayerState, percent_loaded: u32) -> TickOutcome {
    if percent_loaded >= 100 {
        return TickOutcome {
            keep_running: false,
            events: vec![PlayerEvent::Buffered],
        };
    }
    if matches!(state, PlayerState::Playing | PlayerState::Buffering) {
        TickOutcome::keep()
    } else {
        TickOutcome::stop()
    }
}

/// Playback tick: sample progress while playing, stop otherwise.
/// `percent` is `None` when duration or position is unavailable.
pub fn playback_tick(state: PlayerState, percent: Option<u32>) -> TickOutcome {
    if state != PlayerState::Playing {
        return TickOutcome::stop();
    }
    TickOutcome {
        keep_running: true,
        events: percent
            .map(|percent| vec![PlayerEvent::Progress { percent }])
            .unwrap_or_default(),
    }
}

/// The two timer slots: at most one timer per purpose
#[derive(Debug, Clone, Default)]
pub struct PollingTimers {
    buffering: Option<PollingTimer>,
    playback: Option<PollingTimer>,
}

impl PollingTimers {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, purpose: PollPurpose) -> &Option<PollingTimer> {
        match purpose {
            PollPurpose::Buffering => &self.buffering,
            PollPurpose::Playback => &self.playback,
        }
    }

    fn slot_mut(&mut self, purpose: PollPurpose) -> &mut Option<PollingTimer> {
        match purpose {
            PollPurpose::Buffering => &mut self.buffering,
            PollPurpose::Playback => &mut self.playback,
        }
    }

    pub fn is_active(&self, purpose: PollPurpose) -> bool {
        self.slot(purpose).is_some()
    }

    pub fn get(&self, purpose: PollPurpose) -> Option<&PollingTimer> {
        self.slot(purpose).as_ref()
    }

    /// Start a timer unless one is already running. Returns true if started.
    pub fn start(&mut self, purpose: PollPurpose, now: Duration, interval: Duration) -> bool {
        let slot = self.slot_mut(purpose);
        if slot.is_some() {
            return false;
        }
        *slot = Some(PollingTimer::starting_at(now, interval));
        true
    }

    /// Stop a timer. Returns true if one was running.
    pub fn stop(&mut self, purpose: PollPurpose) -> bool {
        self.slot_mut(purpose).take().is_some()
    }

    pub fn reschedule(&mut self, purpose: PollPurpose) {
        if let Some(timer) = self.slot_mut(purpose) {
            timer.reschedule();
        }
    }

    /// Earliest timer due at or before `deadline`. Buffering wins ties.
    pub fn next_due(&self, deadline: Duration) -> Option<(PollPurpose, Duration)> {
        [PollPurpose::Buffering, PollPurpose::Playback]
            .into_iter()
            .filter_map(|purpose| self.get(purpose).map(|timer| (purpose, timer.next_fire)))
            .filter(|(_, fire)| *fire <= deadline)
            .min_by_key(|(_, fire)| *fire)
    }

    pub fn active_count(&self) -> usize {
        self.buffering.is_some() as usize + self.playback.is_some() as usize
    }
}
