//! Session configuration and state types.
//!
//! [`SessionState`] is the mutable state owned by
//! [`PlaybackSession`](crate::services::PlaybackSession). Its methods are pure
//! state transitions; the session decides when to call them and publishes the
//! resulting [`SessionSnapshot`] to observers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BUFFER_HEALTH_BUFFERING, BUFFER_HEALTH_CONNECTING, BUFFER_HEALTH_NONE, BUFFER_HEALTH_PLAYING,
    QUALITY_EXCELLENT_MIN, QUALITY_GOOD_MIN, QUALITY_POOR_MIN,
};
use crate::engine::PlaybackState;
use crate::utils::clamp_volume;

/// Configuration for session retry, health monitoring and initial output.
///
/// All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Retries allowed after the initial play attempt.
    pub max_retries: u32,

    /// Per-attempt timeout for the engine play command (milliseconds).
    pub attempt_timeout_ms: u64,

    /// Base of the linear backoff: retry `n` waits `n * retry_base_delay_ms`.
    pub retry_base_delay_ms: u64,

    /// Interval between health samples while playback is active (milliseconds).
    pub health_check_interval_ms: u64,

    /// Reconnects the health monitor may trigger before giving up.
    /// Independent of `max_retries`.
    pub max_reconnects: u32,

    /// Buffer health below which a playing session is reconnected.
    pub low_buffer_threshold: u8,

    /// Output level at session creation, in `[0, 1]`.
    pub initial_volume: f32,

    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout_ms: 15_000,
            retry_base_delay_ms: 2_000,
            health_check_interval_ms: 5_000,
            max_reconnects: 3,
            low_buffer_threshold: QUALITY_POOR_MIN,
            initial_volume: 1.0,
            event_channel_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would cause runtime issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.attempt_timeout_ms == 0 {
            return Err("attempt_timeout_ms must be >= 1".to_string());
        }
        if self.health_check_interval_ms == 0 {
            return Err(
                "health_check_interval_ms must be >= 1 (tokio interval panics on 0)".to_string(),
            );
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.low_buffer_threshold > 100 {
            return Err("low_buffer_threshold must be <= 100".to_string());
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(format!(
                "initial_volume must be within [0, 1], got {}",
                self.initial_volume
            ));
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}

/// Four-level classification of buffer health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Poor,
    Offline,
}

impl ConnectionQuality {
    /// Classifies a buffer-health value: ≥80 excellent, ≥60 good, ≥30 poor.
    pub fn from_buffer_health(buffer_health: u8) -> Self {
        match buffer_health {
            h if h >= QUALITY_EXCELLENT_MIN => Self::Excellent,
            h if h >= QUALITY_GOOD_MIN => Self::Good,
            h if h >= QUALITY_POOR_MIN => Self::Poor,
            _ => Self::Offline,
        }
    }
}

/// Coarse buffer-health estimate for an engine state.
///
/// This is a heuristic on the reported state, not a measured buffer depth.
pub fn buffer_health_for(state: PlaybackState) -> u8 {
    match state {
        PlaybackState::Playing => BUFFER_HEALTH_PLAYING,
        PlaybackState::Buffering => BUFFER_HEALTH_BUFFERING,
        PlaybackState::Connecting => BUFFER_HEALTH_CONNECTING,
        _ => BUFFER_HEALTH_NONE,
    }
}

/// Mutable state of the playback session.
///
/// Invariants kept by every method:
/// - `muted` implies `volume == 0`
/// - `connection_quality == ConnectionQuality::from_buffer_health(buffer_health)`
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// True once the player is configured and the track registered.
    pub setup_complete: bool,
    pub volume: f32,
    pub muted: bool,
    /// Level restored by the next unmute. Never zero.
    pub pre_mute_volume: f32,
    pub retry_count: u32,
    pub max_retries: u32,
    pub reconnect_count: u32,
    pub max_reconnects: u32,
    pub buffer_health: u8,
    pub connection_quality: ConnectionQuality,
    pub is_playing: bool,
    pub is_loading: bool,
    /// User-visible error of the last failed action.
    pub error: Option<String>,
    /// Last state reported by the engine event stream.
    pub engine_state: PlaybackState,
    /// `play()` calls currently running their attempt sequence.
    pub pending_plays: u32,
}

impl SessionState {
    pub fn new(config: &SessionConfig) -> Self {
        let mut state = Self {
            setup_complete: false,
            volume: 1.0,
            muted: false,
            pre_mute_volume: 1.0,
            retry_count: 0,
            max_retries: config.max_retries,
            reconnect_count: 0,
            max_reconnects: config.max_reconnects,
            buffer_health: BUFFER_HEALTH_NONE,
            connection_quality: ConnectionQuality::Offline,
            is_playing: false,
            is_loading: false,
            error: None,
            engine_state: PlaybackState::None,
            pending_plays: 0,
        };
        state.apply_volume(clamp_volume(config.initial_volume));
        state
    }

    /// Sets buffer health and the quality derived from it in one step.
    pub fn set_buffer_health(&mut self, buffer_health: u8) {
        self.buffer_health = buffer_health.min(100);
        self.connection_quality = ConnectionQuality::from_buffer_health(self.buffer_health);
    }

    /// Applies an explicit (already clamped) volume.
    ///
    /// A nonzero level unmutes. Zero behaves like the mute branch of a mute
    /// toggle: the current level becomes the restore point, unless already muted.
    pub fn apply_volume(&mut self, volume: f32) {
        if volume > 0.0 {
            self.volume = volume;
            self.muted = false;
        } else {
            self.apply_mute(true);
        }
    }

    /// Mutes (storing the restore point) or unmutes (restoring it).
    pub fn apply_mute(&mut self, muted: bool) {
        if muted {
            if !self.muted && self.volume > 0.0 {
                self.pre_mute_volume = self.volume;
            }
            self.volume = 0.0;
            self.muted = true;
        } else if self.muted {
            self.volume = self.pre_mute_volume;
            self.muted = false;
        }
    }

    /// Level the engine should receive if the mute toggle ran now.
    pub fn mute_toggle_target(&self) -> f32 {
        if self.muted {
            self.pre_mute_volume
        } else {
            0.0
        }
    }

    /// Derives the view flags from an engine state report.
    ///
    /// A play call in progress keeps `is_loading` raised even if the engine
    /// reports an idle state between attempts.
    pub fn apply_engine_state(&mut self, state: PlaybackState) {
        self.engine_state = state;
        self.is_playing = state == PlaybackState::Playing;
        self.refresh_loading();
    }

    /// Marks the start of a play call's attempt sequence.
    pub fn begin_play(&mut self) {
        self.pending_plays += 1;
        self.error = None;
        self.retry_count = 0;
        self.refresh_loading();
    }

    /// Marks the end of a play call's attempt sequence.
    pub fn end_play(&mut self) {
        self.pending_plays = self.pending_plays.saturating_sub(1);
        self.refresh_loading();
    }

    fn refresh_loading(&mut self) {
        self.is_loading = self.engine_state.is_loading() || self.pending_plays > 0;
    }

    /// Playback is active while audible or while working towards it.
    pub fn is_active(&self) -> bool {
        self.is_playing || self.is_loading
    }

    /// Reserves one reconnect from the monitor budget.
    ///
    /// Returns the reconnect number, or `None` if the budget is spent.
    pub fn reserve_reconnect(&mut self) -> Option<u32> {
        if self.reconnect_count >= self.max_reconnects {
            return None;
        }
        self.reconnect_count += 1;
        Some(self.reconnect_count)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_playing: self.is_playing,
            is_loading: self.is_loading,
            error: self.error.clone(),
            volume: self.volume,
            is_muted: self.muted,
            buffer_health: self.buffer_health,
            connection_quality: self.connection_quality,
        }
    }
}

/// Observer-facing view of the session, published whenever a field changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_playing: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub volume: f32,
    pub is_muted: bool,
    pub buffer_health: u8,
    pub connection_quality: ConnectionQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        SessionState::new(&SessionConfig::default())
    }

    #[test]
    fn quality_thresholds() {
        use ConnectionQuality::*;
        assert_eq!(ConnectionQuality::from_buffer_health(85), Excellent);
        assert_eq!(ConnectionQuality::from_buffer_health(65), Good);
        assert_eq!(ConnectionQuality::from_buffer_health(35), Poor);
        assert_eq!(ConnectionQuality::from_buffer_health(10), Offline);

        assert_eq!(ConnectionQuality::from_buffer_health(80), Excellent);
        assert_eq!(ConnectionQuality::from_buffer_health(79), Good);
        assert_eq!(ConnectionQuality::from_buffer_health(60), Good);
        assert_eq!(ConnectionQuality::from_buffer_health(30), Poor);
        assert_eq!(ConnectionQuality::from_buffer_health(29), Offline);
        assert_eq!(ConnectionQuality::from_buffer_health(0), Offline);
    }

    #[test]
    fn buffer_health_table() {
        assert_eq!(buffer_health_for(PlaybackState::Playing), 100);
        assert_eq!(buffer_health_for(PlaybackState::Buffering), 50);
        assert_eq!(buffer_health_for(PlaybackState::Connecting), 25);
        assert_eq!(buffer_health_for(PlaybackState::Paused), 0);
        assert_eq!(buffer_health_for(PlaybackState::Ready), 0);
        assert_eq!(buffer_health_for(PlaybackState::None), 0);
    }

    #[test]
    fn set_buffer_health_keeps_quality_in_sync() {
        let mut s = state();
        s.set_buffer_health(65);
        assert_eq!(s.connection_quality, ConnectionQuality::Good);
        s.set_buffer_health(250);
        assert_eq!(s.buffer_health, 100);
        assert_eq!(s.connection_quality, ConnectionQuality::Excellent);
    }

    #[test]
    fn mute_toggle_is_involution() {
        let mut s = state();
        s.apply_volume(0.6);

        s.apply_mute(true);
        assert!(s.muted);
        assert_eq!(s.volume, 0.0);
        assert_eq!(s.pre_mute_volume, 0.6);

        s.apply_mute(false);
        assert!(!s.muted);
        assert_eq!(s.volume, 0.6);
    }

    #[test]
    fn zero_volume_mutes_like_toggle() {
        let mut s = state();
        s.apply_volume(0.4);
        s.apply_volume(0.0);
        assert!(s.muted);
        assert_eq!(s.volume, 0.0);
        assert_eq!(s.pre_mute_volume, 0.4);

        // A second zero keeps the original restore point
        s.apply_volume(0.0);
        assert_eq!(s.pre_mute_volume, 0.4);

        s.apply_mute(false);
        assert_eq!(s.volume, 0.4);
    }

    #[test]
    fn nonzero_volume_unmutes() {
        let mut s = state();
        s.apply_mute(true);
        s.apply_volume(0.3);
        assert!(!s.muted);
        assert_eq!(s.volume, 0.3);
    }

    #[test]
    fn zero_initial_volume_starts_muted() {
        let s = SessionState::new(&SessionConfig {
            initial_volume: 0.0,
            ..Default::default()
        });
        assert!(s.muted);
        assert_eq!(s.volume, 0.0);
        assert_eq!(s.mute_toggle_target(), 1.0);
    }

    #[test]
    fn engine_state_drives_flags() {
        let mut s = state();
        s.apply_engine_state(PlaybackState::Connecting);
        assert!(s.is_loading && !s.is_playing && s.is_active());
        s.apply_engine_state(PlaybackState::Playing);
        assert!(s.is_playing && !s.is_loading);
        s.apply_engine_state(PlaybackState::Paused);
        assert!(!s.is_active());
    }

    #[test]
    fn pending_play_keeps_loading_across_idle_reports() {
        let mut s = state();
        s.retry_count = 2;
        s.error = Some("old".into());

        s.begin_play();
        assert_eq!(s.retry_count, 0);
        assert!(s.error.is_none());
        assert!(s.is_loading);

        s.apply_engine_state(PlaybackState::Stopped);
        assert!(s.is_loading);

        s.end_play();
        assert!(!s.is_loading);

        s.begin_play();
        s.apply_engine_state(PlaybackState::Buffering);
        s.end_play();
        assert!(s.is_loading, "engine still buffering");
    }

    #[test]
    fn reconnect_budget_is_bounded() {
        let mut s = SessionState::new(&SessionConfig {
            max_reconnects: 2,
            ..Default::default()
        });
        assert_eq!(s.reserve_reconnect(), Some(1));
        assert_eq!(s.reserve_reconnect(), Some(2));
        assert_eq!(s.reserve_reconnect(), None);
        assert_eq!(s.reconnect_count, 2);
    }

    #[test]
    fn config_validation() {
        assert!(SessionConfig::default().validate().is_ok());

        let bad = [
            SessionConfig {
                attempt_timeout_ms: 0,
                ..Default::default()
            },
            SessionConfig {
                health_check_interval_ms: 0,
                ..Default::default()
            },
            SessionConfig {
                event_channel_capacity: 0,
                ..Default::default()
            },
            SessionConfig {
                initial_volume: 1.5,
                ..Default::default()
            },
            SessionConfig {
                low_buffer_threshold: 101,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be invalid", config);
        }
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(state().snapshot()).unwrap();
        assert_eq!(json["isPlaying"], false);
        assert_eq!(json["bufferHealth"], 0);
        assert_eq!(json["connectionQuality"], "offline");
        assert!(json["error"].is_null());
    }
}
