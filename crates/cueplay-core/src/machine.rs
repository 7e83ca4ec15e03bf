//! State machine core
//!
//! Applies remote state changes and errors, derives the synthetic `Buffered`
//! and `Progress` events through polling, and issues playback commands.
//! Commands are silently skipped in states where they make no sense (most of
//! them while `NotLoaded`).

use crate::{
    adapter::PlayerAdapter,
    events::PlayerEvent,
    remote::RemoteCommand,
    timers::{buffering_tick, playback_tick, PollPurpose},
    types::*,
};
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

impl PlayerAdapter {
    /// Current state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Current state name
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Current numeric state id
    pub fn state_id(&self) -> i32 {
        self.state.id()
    }

    fn is_loaded(&self) -> bool {
        self.state != PlayerState::NotLoaded
    }

    /// Apply a state reported by the embedded player.
    ///
    /// Emits, in order: `Start` (cold start only), the state's own event,
    /// `Buffered` when buffering is already complete, then `StateChange`.
    #[instrument(skip(self))]
    pub fn apply_remote_state_change(&mut self, new_state: PlayerState) {
        if !new_state.is_native() {
            warn!(state = %new_state, "Remote cannot report adapter-internal state");
            return;
        }

        let previous = self.state;
        self.state = new_state;
        debug!(from = %previous, to = %new_state, "State transition");

        if new_state == PlayerState::Playing
            && matches!(previous, PlayerState::Ended | PlayerState::Unstarted)
        {
            self.emit(PlayerEvent::Start);
        }

        if let Some(event) = PlayerEvent::for_state(new_state) {
            self.emit(event);
        }

        if new_state == PlayerState::Buffering && !self.timers.is_active(PollPurpose::Buffering) {
            if self.percent_loaded().unwrap_or(0) < 100 {
                let interval = self.config.loading_interval();
                self.timers.start(PollPurpose::Buffering, self.clock, interval);
                debug!(interval_ms = interval.as_millis() as u64, "Buffering timer started");
            } else {
                self.emit(PlayerEvent::Buffered);
            }
        }

        if new_state == PlayerState::Playing {
            let interval = self.config.playback_interval();
            if self.timers.start(PollPurpose::Playback, self.clock, interval) {
                debug!(interval_ms = interval.as_millis() as u64, "Playback timer started");
            }
        } else if self.timers.stop(PollPurpose::Playback) {
            debug!("Playback timer stopped");
        }

        self.emit(PlayerEvent::StateChange { new_state, previous });
    }

    /// Apply an error reported by the embedded player.
    ///
    /// Emits `NotFound` / `NotAllowed` for known codes, re-cues the pending
    /// video at its requested offset so the player stays primed, then emits
    /// `Error`.
    #[instrument(skip(self))]
    pub fn apply_remote_error(&mut self, code: i32) {
        let kind = RemoteErrorKind::from_code(code);
        warn!(code = code, kind = ?kind, "Player error");

        match kind {
            RemoteErrorKind::NotFound => self.emit(PlayerEvent::NotFound),
            RemoteErrorKind::NotAllowed => self.emit(PlayerEvent::NotAllowed),
            RemoteErrorKind::Other(_) => {}
        }

        if let Some(start_seconds) = self.pending.as_ref().map(|p| p.start_seconds) {
            self.cue(start_seconds);
        }

        self.emit(PlayerEvent::Error { code });
    }

    /// Load `video_id` and start it
    #[instrument(skip(self))]
    pub fn play_video(&mut self, video_id: &str, start_seconds: Option<f64>) {
        self.pending = Some(PendingVideoRequest::new(video_id, start_seconds));
        if !self.is_loaded() {
            debug!("Player not loaded, request kept for later");
            return;
        }
        self.emit(PlayerEvent::Loading);
        self.send(RemoteCommand::LoadVideoById {
            video_id: video_id.to_string(),
            start_seconds,
        });
    }

    /// Cue `video_id` without starting it
    #[instrument(skip(self))]
    pub fn load_video(&mut self, video_id: &str, start_seconds: Option<f64>) {
        self.pending = Some(PendingVideoRequest::new(video_id, start_seconds));
        if !self.is_loaded() {
            debug!("Player not loaded, request kept for later");
            return;
        }
        self.emit(PlayerEvent::Loading);
        self.send(RemoteCommand::CueVideoById {
            video_id: video_id.to_string(),
            start_seconds,
        });
    }

    /// Resume a paused, buffering or cued video, or restart an ended one.
    ///
    /// `start_seconds` only applies to the restart.
    #[instrument(skip(self))]
    pub fn play(&mut self, start_seconds: Option<f64>) {
        match self.state {
            PlayerState::Paused | PlayerState::Buffering | PlayerState::Cueing => {
                self.send(RemoteCommand::PlayVideo);
            }
            PlayerState::Ended => {
                let Some(pending) = self.pending.as_mut() else {
                    debug!("No video to restart");
                    return;
                };
                pending.start_seconds = start_seconds;
                let video_id = pending.video_id.clone();
                self.emit(PlayerEvent::Loading);
                self.send(RemoteCommand::LoadVideoById {
                    video_id,
                    start_seconds,
                });
            }
            state => debug!(state = %state, "Play skipped"),
        }
    }

    /// Cue the pending video
    #[instrument(skip(self))]
    pub fn cue(&mut self, start_seconds: Option<f64>) {
        if !self.is_loaded() {
            debug!("Cue skipped, player not loaded");
            return;
        }
        let Some(pending) = self.pending.as_mut() else {
            debug!("Cue skipped, no pending video");
            return;
        };
        pending.start_seconds = start_seconds;
        let video_id = pending.video_id.clone();
        self.send(RemoteCommand::CueVideoById {
            video_id,
            start_seconds,
        });
    }

    /// Pause, only while playing or buffering
    #[instrument(skip(self))]
    pub fn pause(&mut self) {
        if matches!(self.state, PlayerState::Playing | PlayerState::Buffering) {
            self.send(RemoteCommand::PauseVideo);
        } else {
            debug!(state = %self.state, "Pause skipped");
        }
    }

    /// Stop playback
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        if self.is_loaded() {
            self.send(RemoteCommand::StopVideo);
        } else {
            debug!("Stop skipped, player not loaded");
        }
    }

    fn query_number(&mut self, command: RemoteCommand) -> Option<f64> {
        if !self.is_loaded() {
            return None;
        }
        self.send(command).as_number()
    }

    /// Bytes of the video loaded so far, `Some(0)` when the player does not know
    pub fn bytes_loaded(&mut self) -> Option<u64> {
        if !self.is_loaded() {
            return None;
        }
        Some(
            self.query_number(RemoteCommand::GetVideoBytesLoaded)
                .map_or(0, |n| n.max(0.0) as u64),
        )
    }

    /// Total bytes of the video, `Some(0)` when the player does not know
    pub fn bytes_total(&mut self) -> Option<u64> {
        if !self.is_loaded() {
            return None;
        }
        Some(
            self.query_number(RemoteCommand::GetVideoBytesTotal)
                .map_or(0, |n| n.max(0.0) as u64),
        )
    }

    /// Loaded share of the video, in percent
    pub fn percent_loaded(&mut self) -> Option<u32> {
        let total = self.bytes_total()?;
        let loaded = self.bytes_loaded()?;
        Some(percent(loaded as f64, total as f64))
    }

    /// Duration in seconds
    pub fn duration(&mut self) -> Option<f64> {
        self.query_number(RemoteCommand::GetDuration)
    }

    /// Playback position in seconds
    pub fn current_time(&mut self) -> Option<f64> {
        self.query_number(RemoteCommand::GetCurrentTime)
    }

    /// Played share of the duration, in percent
    pub fn current_percent(&mut self) -> Option<u32> {
        let total = self.duration()?;
        let current = self.current_time()?;
        Some(percent(current, total))
    }

    /// Embed snippet for the current video
    pub fn video_embed_code(&mut self) -> Option<String> {
        if !self.is_loaded() {
            return None;
        }
        self.send(RemoteCommand::GetVideoEmbedCode)
            .as_text()
            .map(str::to_string)
    }

    /// Advance the virtual clock by `elapsed`, running every timer tick that
    /// falls due, in time order.
    pub fn advance(&mut self, elapsed: Duration) {
        let deadline = self.clock + elapsed;
        while let Some((purpose, fire_at)) = self.timers.next_due(deadline) {
            self.clock = fire_at;
            self.tick(purpose);
        }
        self.clock = deadline;
    }

    fn tick(&mut self, purpose: PollPurpose) {
        let outcome = match purpose {
            PollPurpose::Buffering => {
                let loaded = self.percent_loaded().unwrap_or(0);
                buffering_tick(self.state, loaded)
            }
            PollPurpose::Playback => {
                let played = self.current_percent();
                playback_tick(self.state, played)
            }
        };
        trace!(purpose = %purpose, keep_running = outcome.keep_running, "Timer tick");

        if outcome.keep_running {
            self.timers.reschedule(purpose);
        } else {
            self.timers.stop(purpose);
            debug!(purpose = %purpose, "Timer stopped");
        }

        for event in outcome.events {
            self.emit(event);
        }
    }
}
