//! Trait abstraction for the external media engine.
//!
//! The session depends on this trait rather than a concrete player, so the
//! host platform's engine and the in-process simulator are interchangeable.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::engine::types::{EngineEvent, PlaybackState, PlayerConfig};
use crate::error::EngineResult;
use crate::track::{Track, TrackMetadata};

/// Capability set of the media-playback engine.
///
/// The engine owns decoding, buffering, transport and OS media-session
/// integration. Every call may suspend; none of them is retried by the
/// engine itself.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Configures buffering policy and remote-control capabilities.
    async fn setup_player(&self, config: &PlayerConfig) -> EngineResult<()>;

    /// Registers the live track. Requires a prior `setup_player`.
    async fn register_track(&self, track: &Track) -> EngineResult<()>;

    /// Starts (or resumes) playback of the registered track.
    ///
    /// Success only means the command was accepted. The audible `Playing`
    /// state arrives later through [`subscribe`](Self::subscribe).
    async fn play(&self) -> EngineResult<()>;

    async fn pause(&self) -> EngineResult<()>;

    async fn stop(&self) -> EngineResult<()>;

    /// Tears down the engine session and forgets the registered track.
    async fn reset(&self) -> EngineResult<()>;

    /// Sets the output level in `[0, 1]`.
    async fn set_volume(&self, volume: f32) -> EngineResult<()>;

    /// Queries the current playback state.
    async fn get_playback_state(&self) -> EngineResult<PlaybackState>;

    /// Updates the media-center metadata of a registered track.
    async fn update_metadata(&self, track_id: &str, metadata: &TrackMetadata)
        -> EngineResult<()>;

    /// Opens a new subscription to the engine event stream.
    ///
    /// Events are delivered in emission order. Dropping the receiver removes
    /// the subscription.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
