//! Centralized error types for the session core.
//!
//! Two layers of errors exist:
//! - [`EngineError`] is what a [`MediaEngine`](crate::engine::MediaEngine)
//!   implementation returns from any call.
//! - [`SessionError`] is what the playback session surfaces to its callers and,
//!   as a display string, to the view layer.

use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Errors reported by the external media engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The engine refused a command.
    #[error("{operation} rejected: {reason}")]
    Rejected {
        /// Engine operation that was refused (e.g. `"play"`).
        operation: &'static str,
        /// Engine-provided reason.
        reason: String,
    },

    /// A command was issued before the player was set up or the track registered.
    #[error("player is not set up")]
    NotSetUp,

    /// The engine could not be reached at all.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    /// Shorthand for building a [`EngineError::Rejected`].
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "engine_rejected",
            Self::NotSetUp => "engine_not_set_up",
            Self::Unavailable(_) => "engine_unavailable",
        }
    }
}

/// Convenient Result alias for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the playback session.
#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum SessionError {
    /// Player configuration or track registration failed.
    #[error("Engine setup failed: {0}")]
    EngineSetup(String),

    /// A single play attempt did not complete within the attempt timeout.
    #[error("Connection timed out after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Per-attempt timeout that elapsed.
        timeout_ms: u64,
    },

    /// Every play attempt failed. Terminal for the current `play()` call.
    #[error("Could not connect to the stream after {attempts} attempt(s): {last_error}")]
    ConnectionExhausted {
        /// Total attempts made (initial attempt plus retries).
        attempts: u32,
        /// Failure reported by the final attempt.
        last_error: String,
    },

    /// The engine rejected a volume change.
    #[error("Volume change failed: {0}")]
    VolumeChange(String),

    /// The engine rejected the volume command issued by a mute toggle.
    #[error("Mute toggle failed: {0}")]
    MuteToggle(String),

    /// The engine rejected a play, pause or stop command.
    #[error("Playback command failed: {0}")]
    Playback(String),

    /// A concurrent `stop()` interrupted the retry loop.
    #[error("Playback start interrupted by stop")]
    Interrupted,

    /// Session configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SessionError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EngineSetup(_) => "engine_setup_failed",
            Self::ConnectionTimeout { .. } => "connection_timeout",
            Self::ConnectionExhausted { .. } => "connection_exhausted",
            Self::VolumeChange(_) => "volume_change_failed",
            Self::MuteToggle(_) => "mute_toggle_failed",
            Self::Playback(_) => "playback_command_failed",
            Self::Interrupted => "interrupted",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

impl ErrorCode for SessionError {
    fn code(&self) -> &'static str {
        SessionError::code(self)
    }
}

/// Convenient Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
