//! Domain events emitted by the session and its health monitor.
//!
//! This module provides:
//! - [`EventEmitter`] trait for services to emit events
//! - [`BroadcastEventBridge`] for fan-out to any number of listeners
//! - Event types for session lifecycle and connection health
//!
//! These complement the snapshot subscription returned by
//! [`PlaybackSession::subscribe`](crate::services::PlaybackSession::subscribe):
//! snapshots carry the current state, events carry what happened.

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::engine::PlaybackState;
use crate::state::{ConnectionQuality, SessionSnapshot};

/// Events broadcast to listeners.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Events from the playback session.
    Session(SessionEvent),

    /// Events from the health monitor.
    Health(HealthEvent),
}

/// A remote-control press received from the OS media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteCommand {
    Play,
    Pause,
    Stop,
}

/// Events related to the playback session lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// At least one snapshot field changed.
    StateChanged {
        snapshot: SessionSnapshot,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A play attempt failed and another one is scheduled.
    RetryScheduled {
        #[serde(rename = "retryCount")]
        retry_count: u32,
        #[serde(rename = "maxRetries")]
        max_retries: u32,
        #[serde(rename = "delayMs")]
        delay_ms: u64,
        /// Failure of the attempt that triggered the retry.
        error: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A play call ended in a terminal failure.
    PlaybackFailed {
        error: String,
        /// Machine-readable error code.
        code: &'static str,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A remote-control press was dispatched to the session.
    RemoteCommand {
        command: RemoteCommand,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to connection health sampling.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HealthEvent {
    /// A health sample was taken.
    Sampled {
        state: PlaybackState,
        #[serde(rename = "bufferHealth")]
        buffer_health: u8,
        quality: ConnectionQuality,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Sampling the engine failed; quality was degraded to offline.
    SampleFailed {
        error: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The monitor triggered a reconnect on low buffer health.
    ReconnectTriggered {
        #[serde(rename = "reconnectCount")]
        reconnect_count: u32,
        #[serde(rename = "bufferHealth")]
        buffer_health: u8,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl From<SessionEvent> for BroadcastEvent {
    fn from(event: SessionEvent) -> Self {
        BroadcastEvent::Session(event)
    }
}

impl From<HealthEvent> for BroadcastEvent {
    fn from(event: HealthEvent) -> Self {
        BroadcastEvent::Health(event)
    }
}
