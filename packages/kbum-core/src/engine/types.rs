//! Value types exchanged with the media engine.

use serde::{Deserialize, Serialize};

use crate::constants::{ENGINE_MAX_CACHE_SIZE_KB, ENGINE_PROGRESS_UPDATE_INTERVAL_SECS};

/// Playback state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    /// Nothing loaded.
    #[default]
    None,
    /// Track loaded, not started.
    Ready,
    Playing,
    Paused,
    /// Connected, filling the buffer.
    Buffering,
    /// Opening the stream connection.
    Connecting,
    Stopped,
}

impl PlaybackState {
    /// Returns true while the engine is working towards audible output.
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Buffering | Self::Connecting)
    }
}

/// Remote-control capabilities advertised to the OS media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Play,
    Pause,
    Stop,
}

/// What the engine should do with playback when the host app is killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppKilledBehavior {
    #[default]
    ContinuePlayback,
    PausePlayback,
    StopPlaybackAndRemoveNotification,
}

/// Player configuration passed to [`MediaEngine::setup_player`](super::MediaEngine::setup_player).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Hold playback until the engine buffer has data.
    pub wait_for_buffer: bool,
    pub max_cache_size_kb: u32,
    pub app_killed_behavior: AppKilledBehavior,
    pub always_pause_on_interruption: bool,
    /// Capabilities on the full media-session controls.
    pub capabilities: Vec<Capability>,
    /// Capabilities on the compact (collapsed notification) controls.
    pub compact_capabilities: Vec<Capability>,
    /// Capabilities on the notification controls.
    pub notification_capabilities: Vec<Capability>,
    pub progress_update_interval_secs: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let transport = vec![Capability::Play, Capability::Pause, Capability::Stop];
        Self {
            wait_for_buffer: true,
            max_cache_size_kb: ENGINE_MAX_CACHE_SIZE_KB,
            app_killed_behavior: AppKilledBehavior::ContinuePlayback,
            always_pause_on_interruption: false,
            capabilities: transport.clone(),
            compact_capabilities: transport.clone(),
            notification_capabilities: transport,
            progress_update_interval_secs: ENGINE_PROGRESS_UPDATE_INTERVAL_SECS,
        }
    }
}

/// Events pushed by the engine, delivered in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineEvent {
    /// Playback state changed.
    PlaybackState(PlaybackState),
    /// Play pressed on the lock screen / notification / headset.
    RemotePlay,
    /// Pause pressed on a remote control surface.
    RemotePause,
    /// Stop pressed on a remote control surface.
    RemoteStop,
    /// The engine hit an unrecoverable playback error.
    PlaybackError(String),
    /// The engine ran out of queued tracks.
    QueueEnded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_states() {
        assert!(PlaybackState::Buffering.is_loading());
        assert!(PlaybackState::Connecting.is_loading());
        assert!(!PlaybackState::Playing.is_loading());
        assert!(!PlaybackState::Stopped.is_loading());
        assert!(!PlaybackState::None.is_loading());
    }

    #[test]
    fn default_player_config_exposes_transport_controls() {
        let config = PlayerConfig::default();
        assert!(config.wait_for_buffer);
        assert_eq!(config.app_killed_behavior, AppKilledBehavior::ContinuePlayback);
        assert_eq!(
            config.compact_capabilities,
            vec![Capability::Play, Capability::Pause, Capability::Stop]
        );
        assert_eq!(config.progress_update_interval_secs, 2);
    }

    #[test]
    fn engine_event_serializes_with_tag() {
        let json = serde_json::to_value(EngineEvent::PlaybackState(PlaybackState::Buffering))
            .unwrap();
        assert_eq!(json["type"], "playbackState");
        assert_eq!(json["data"], "buffering");
    }
}
