//! Remote player handle
//!
//! The embedded player is only reachable through a narrow command interface:
//! one synchronous `remote(command) -> value` round trip per call. Its
//! asynchronous notifications (state changes, errors) come back through host
//! callbacks registered with [`RemoteCommand::AddEventListener`].

use serde::{Deserialize, Serialize};

/// Notification channels of the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteEvent {
    StateChange,
    Error,
}

impl RemoteEvent {
    /// Event name understood by the embedded player
    pub fn name(&self) -> &'static str {
        match self {
            RemoteEvent::StateChange => "onStateChange",
            RemoteEvent::Error => "onError",
        }
    }
}

/// Commands understood by the embedded player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RemoteCommand {
    GetPlayerState,
    GetVideoBytesLoaded,
    GetVideoBytesTotal,
    GetDuration,
    GetCurrentTime,
    GetVideoEmbedCode,
    PlayVideo,
    PauseVideo,
    StopVideo,
    /// Prepare a video without starting it
    CueVideoById {
        video_id: String,
        start_seconds: Option<f64>,
    },
    /// Load a video and start it
    LoadVideoById {
        video_id: String,
        start_seconds: Option<f64>,
    },
    /// Route `event` to the host callback registered as `callback`
    AddEventListener {
        event: RemoteEvent,
        callback: String,
    },
}

impl RemoteCommand {
    /// Native command name
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCommand::GetPlayerState => "getPlayerState",
            RemoteCommand::GetVideoBytesLoaded => "getVideoBytesLoaded",
            RemoteCommand::GetVideoBytesTotal => "getVideoBytesTotal",
            RemoteCommand::GetDuration => "getDuration",
            RemoteCommand::GetCurrentTime => "getCurrentTime",
            RemoteCommand::GetVideoEmbedCode => "getVideoEmbedCode",
            RemoteCommand::PlayVideo => "playVideo",
            RemoteCommand::PauseVideo => "pauseVideo",
            RemoteCommand::StopVideo => "stopVideo",
            RemoteCommand::CueVideoById { .. } => "cueVideoById",
            RemoteCommand::LoadVideoById { .. } => "loadVideoById",
            RemoteCommand::AddEventListener { .. } => "addEventListener",
        }
    }

    /// True for commands that only read player state
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            RemoteCommand::GetPlayerState
                | RemoteCommand::GetVideoBytesLoaded
                | RemoteCommand::GetVideoBytesTotal
                | RemoteCommand::GetDuration
                | RemoteCommand::GetCurrentTime
                | RemoteCommand::GetVideoEmbedCode
        )
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteCommand::CueVideoById { video_id, start_seconds }
            | RemoteCommand::LoadVideoById { video_id, start_seconds } => match start_seconds {
                Some(start) => write!(f, "{}({}, {})", self.name(), video_id, start),
                None => write!(f, "{}({})", self.name(), video_id),
            },
            RemoteCommand::AddEventListener { event, callback } => {
                write!(f, "{}({}, {})", self.name(), event.name(), callback)
            }
            _ => write!(f, "{}()", self.name()),
        }
    }
}

/// Value returned by a remote call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl RemoteValue {
    /// Numeric value. The player signals "unavailable" with `-1`, which maps to `None`
    /// along with non-numeric replies.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RemoteValue::Number(n) if *n != -1.0 => Some(*n),
            RemoteValue::Text(text) => text.trim().parse::<f64>().ok().filter(|n| *n != -1.0),
            _ => None,
        }
    }

    /// Raw integer code, used for state and error codes where `-1` is meaningful
    pub fn as_code(&self) -> Option<i32> {
        match self {
            RemoteValue::Number(n) => Some(*n as i32),
            RemoteValue::Text(text) => text.trim().parse::<i32>().ok(),
            RemoteValue::Empty => None,
        }
    }

    /// Text value, empty strings map to `None`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RemoteValue::Text(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

impl From<f64> for RemoteValue {
    fn from(n: f64) -> Self {
        RemoteValue::Number(n)
    }
}

impl From<i32> for RemoteValue {
    fn from(n: i32) -> Self {
        RemoteValue::Number(n as f64)
    }
}

impl From<String> for RemoteValue {
    fn from(text: String) -> Self {
        RemoteValue::Text(text)
    }
}

/// Handle to an embedded player instance
pub trait RemotePlayer {
    /// Run one command on the embedded player
    fn remote(&mut self, command: RemoteCommand) -> RemoteValue;
}

impl<P: RemotePlayer + ?Sized> RemotePlayer for Box<P> {
    fn remote(&mut self, command: RemoteCommand) -> RemoteValue {
        (**self).remote(command)
    }
}
