//! Core types for cueplay

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player state as tracked by the adapter
///
/// `NotLoaded` and `PlayerLoaded` only exist on the adapter side; every other
/// variant mirrors a numeric state reported by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Embedded player has not finished its handshake yet
    NotLoaded,
    /// Handshake done, no state reported by the player yet
    PlayerLoaded,
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    /// A video is cued and can be started with `play`
    Cueing,
}

impl PlayerState {
    /// Every state, in id order
    pub const ALL: [PlayerState; 8] = [
        PlayerState::NotLoaded,
        PlayerState::PlayerLoaded,
        PlayerState::Unstarted,
        PlayerState::Ended,
        PlayerState::Playing,
        PlayerState::Paused,
        PlayerState::Buffering,
        PlayerState::Cueing,
    ];

    /// Numeric state id. Native states use the embedded player's codes.
    pub fn id(&self) -> i32 {
        match self {
            PlayerState::NotLoaded => -3,
            PlayerState::PlayerLoaded => -2,
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cueing => 5,
        }
    }

    /// Look up a state by its numeric id
    pub fn from_id(id: i32) -> Option<PlayerState> {
        Self::ALL.iter().copied().find(|state| state.id() == id)
    }

    /// Look up a state the embedded player may report. Adapter-internal ids
    /// are rejected.
    pub fn from_native_code(code: i32) -> Option<PlayerState> {
        Self::from_id(code).filter(|state| state.is_native())
    }

    /// True for states the embedded player itself reports
    pub fn is_native(&self) -> bool {
        !matches!(self, PlayerState::NotLoaded | PlayerState::PlayerLoaded)
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            PlayerState::NotLoaded => "NotLoaded",
            PlayerState::PlayerLoaded => "PlayerLoaded",
            PlayerState::Unstarted => "Unstarted",
            PlayerState::Ended => "Ended",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::Buffering => "Buffering",
            PlayerState::Cueing => "Cueing",
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error codes reported by the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// Requested video does not exist (100)
    NotFound,
    /// Owner does not allow embedding (101, and its alias 150)
    NotAllowed,
    /// Any code without a dedicated event
    Other(i32),
}

impl RemoteErrorKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            100 => RemoteErrorKind::NotFound,
            101 | 150 => RemoteErrorKind::NotAllowed,
            other => RemoteErrorKind::Other(other),
        }
    }
}

/// Last requested video, re-cued after player errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingVideoRequest {
    pub video_id: String,
    pub start_seconds: Option<f64>,
}

impl PendingVideoRequest {
    pub fn new(video_id: impl Into<String>, start_seconds: Option<f64>) -> Self {
        Self {
            video_id: video_id.into(),
            start_seconds,
        }
    }
}

/// Adapter configuration
///
/// Field names on the wire follow the embed options (`videoId`, `autoStart`,
/// `loading_check_interval`, ...). Intervals are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Video cued once the player is ready
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
    /// Start playback instead of cueing at handshake
    #[serde(rename = "autoStart")]
    pub auto_start: bool,
    /// Player width in pixels
    pub width: u32,
    /// Player height in pixels
    pub height: u32,
    /// Poll interval while buffering (ms)
    pub loading_check_interval: u64,
    /// Poll interval while playing (ms)
    pub playback_time_check_interval: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_id: None,
            auto_start: false,
            width: 640,
            height: 385,
            loading_check_interval: 1000,
            playback_time_check_interval: 1000,
        }
    }
}

impl PlayerConfig {
    /// Config that cues `video_id` at handshake
    pub fn with_video(video_id: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Default::default()
        }
    }

    /// Parse from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the adapter cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.loading_check_interval == 0 {
            return Err(Error::InvalidConfig(
                "loading_check_interval must be greater than 0".to_string(),
            ));
        }
        if self.playback_time_check_interval == 0 {
            return Err(Error::InvalidConfig(
                "playback_time_check_interval must be greater than 0".to_string(),
            ));
        }
        if matches!(self.video_id.as_deref(), Some("")) {
            return Err(Error::InvalidConfig("videoId must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn loading_interval(&self) -> Duration {
        Duration::from_millis(self.loading_check_interval)
    }

    pub fn playback_interval(&self) -> Duration {
        Duration::from_millis(self.playback_time_check_interval)
    }
}

/// Check a mount target against `[0-9A-Za-z_]+`
pub fn validate_target(target: &str) -> Result<()> {
    let valid = !target.is_empty()
        && target
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTarget(target.to_string()))
    }
}

/// Percentage of `numerator` over `denominator`, rounded up.
///
/// A zero on either side is 0, so nothing loaded out of nothing known is not
/// complete. Otherwise equal values are 100.
pub fn percent(numerator: f64, denominator: f64) -> u32 {
    if numerator == 0.0 || denominator == 0.0 {
        return 0;
    }
    if numerator == denominator {
        return 100;
    }
    (100.0 * numerator / denominator).ceil().max(0.0) as u32
}
