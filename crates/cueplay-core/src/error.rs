//! Error types for cueplay core

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter error types
///
/// Remote player errors (unknown video, embedding not allowed) are not part of
/// this enum: they are recoverable and surface as events on the bus.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid target '{0}': may contain only 0-9, A-Z, a-z and _ (underscores)")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    // Host wiring errors
    #[error("Player instance already registered: {player_id}")]
    DuplicateInstance { player_id: String },

    #[error("No callback registered under '{0}'")]
    UnknownCallback(String),
}

impl Error {
    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnknownCallback(_))
    }

    /// Returns true if this error aborts adapter construction
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidTarget(_) | Error::InvalidConfig(_) | Error::ConfigParse(_)
        )
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidTarget(_) => "INVALID_TARGET",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ConfigParse(_) => "CONFIG_PARSE",
            Error::DuplicateInstance { .. } => "DUPLICATE_INSTANCE",
            Error::UnknownCallback(_) => "UNKNOWN_CALLBACK",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        let err = Error::InvalidTarget("bad-target".to_string());
        assert!(err.is_configuration());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "INVALID_TARGET");
    }

    #[test]
    fn test_unknown_callback_is_recoverable() {
        let err = Error::UnknownCallback("cueplay_box_onError".to_string());
        assert!(err.is_recoverable());
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("cueplay_box_onError"));
    }
}
