//! In-process media engine.
//!
//! [`SimulatedEngine`] implements [`MediaEngine`] without producing audio. It
//! walks `Connecting → Buffering → Playing` when asked to play, records every
//! call, and can be scripted to reject, hang, hold or go offline. The
//! headless CLI drives it interactively and the session tests use it as their
//! engine double.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};

use super::traits::MediaEngine;
use super::types::{EngineEvent, PlaybackState, PlayerConfig};
use crate::error::{EngineError, EngineResult};
use crate::track::{Track, TrackMetadata};

/// Capacity of the simulated engine's event channel.
const EVENT_CAPACITY: usize = 64;

/// Engine operations, used for fault scripting and call recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    SetupPlayer,
    RegisterTrack,
    Play,
    Pause,
    Stop,
    Reset,
    SetVolume,
    GetPlaybackState,
    UpdateMetadata,
}

impl EngineOp {
    fn name(self) -> &'static str {
        match self {
            Self::SetupPlayer => "setup_player",
            Self::RegisterTrack => "register_track",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::SetVolume => "set_volume",
            Self::GetPlaybackState => "get_playback_state",
            Self::UpdateMetadata => "update_metadata",
        }
    }
}

#[derive(Debug, Default)]
struct EngineModel {
    playback: PlaybackState,
    volume: f32,
    player_ready: bool,
    track: Option<Track>,
    metadata: Option<TrackMetadata>,
    /// Bumped by every command that invalidates a pending state walk.
    epoch: u64,
}

#[derive(Debug, Default)]
struct FaultScript {
    failures: HashMap<EngineOp, u32>,
    hanging_plays: u32,
    /// One-shot holds released through the returned `Notify`.
    gates: HashMap<EngineOp, Arc<Notify>>,
    offline: bool,
}

/// Scriptable engine that simulates a live-stream player.
pub struct SimulatedEngine {
    events: broadcast::Sender<EngineEvent>,
    model: Arc<Mutex<EngineModel>>,
    faults: Mutex<FaultScript>,
    calls: Mutex<Vec<EngineOp>>,
    /// Delay between simulated state steps. `None` walks all states inside `play()`.
    step_delay: Option<Duration>,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngine {
    /// Creates an engine whose `play()` reaches `Playing` before returning.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            model: Arc::new(Mutex::new(EngineModel {
                volume: 1.0,
                ..Default::default()
            })),
            faults: Mutex::new(FaultScript::default()),
            calls: Mutex::new(Vec::new()),
            step_delay: None,
        }
    }

    /// Creates an engine that pauses `delay` between each connection step.
    pub fn with_step_delay(delay: Duration) -> Self {
        Self {
            step_delay: Some(delay),
            ..Self::new()
        }
    }

    /// Makes the next `times` calls of `op` fail with [`EngineError::Rejected`].
    pub fn fail_next(&self, op: EngineOp, times: u32) {
        *self.faults.lock().failures.entry(op).or_insert(0) += times;
    }

    /// Makes the next `times` play commands never complete.
    pub fn hang_next_play(&self, times: u32) {
        self.faults.lock().hanging_plays += times;
    }

    /// Holds the next call of `op` in flight until the returned handle is
    /// notified. Supported for `Play` (held before the state walk) and
    /// `GetPlaybackState` (held after the state is read).
    pub fn gate_next(&self, op: EngineOp) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.faults.lock().gates.insert(op, Arc::clone(&gate));
        gate
    }

    /// Simulates losing the engine entirely: every call fails with
    /// [`EngineError::Unavailable`] until brought back online.
    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().offline = offline;
    }

    /// Forces a playback state and emits it, as a real engine would on a
    /// network dropout or recovery.
    pub fn set_playback_state(&self, state: PlaybackState) {
        let mut model = self.model.lock();
        model.epoch += 1;
        model.playback = state;
        drop(model);
        self.emit(EngineEvent::PlaybackState(state));
    }

    /// Emits an arbitrary engine event (remote-control presses, errors).
    pub fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.events.send(event) {
            log::trace!("[SimulatedEngine] No event subscribers: {}", e);
        }
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<EngineOp> {
        self.calls.lock().clone()
    }

    /// Returns how many times `op` was called.
    pub fn call_count(&self, op: EngineOp) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.model.lock().playback
    }

    /// Last volume accepted by the engine.
    pub fn volume(&self) -> f32 {
        self.model.lock().volume
    }

    pub fn registered_track(&self) -> Option<Track> {
        self.model.lock().track.clone()
    }

    /// Metadata last pushed through `update_metadata`.
    pub fn metadata(&self) -> Option<TrackMetadata> {
        self.model.lock().metadata.clone()
    }

    /// Records the call and consumes a scripted failure if one is pending.
    fn enter(&self, op: EngineOp) -> EngineResult<()> {
        self.calls.lock().push(op);
        let mut faults = self.faults.lock();
        if faults.offline {
            return Err(EngineError::Unavailable(format!("{} while offline", op.name())));
        }
        if let Some(remaining) = faults.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EngineError::rejected(op.name(), "simulated failure"));
            }
        }
        Ok(())
    }

    /// Waits on a pending gate for `op`, if one was set.
    async fn pass_gate(&self, op: EngineOp) {
        let gate = self.faults.lock().gates.remove(&op);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    /// Sets the state and emits it unless a newer command superseded `epoch`.
    fn step(
        model: &Mutex<EngineModel>,
        events: &broadcast::Sender<EngineEvent>,
        epoch: u64,
        state: PlaybackState,
    ) -> bool {
        let mut guard = model.lock();
        if guard.epoch != epoch {
            return false;
        }
        guard.playback = state;
        drop(guard);
        let _ = events.send(EngineEvent::PlaybackState(state));
        true
    }

    fn transition(&self, state: PlaybackState) {
        let mut model = self.model.lock();
        model.epoch += 1;
        model.playback = state;
        drop(model);
        self.emit(EngineEvent::PlaybackState(state));
    }
}

#[async_trait]
impl MediaEngine for SimulatedEngine {
    async fn setup_player(&self, _config: &PlayerConfig) -> EngineResult<()> {
        self.enter(EngineOp::SetupPlayer)?;
        self.model.lock().player_ready = true;
        Ok(())
    }

    async fn register_track(&self, track: &Track) -> EngineResult<()> {
        self.enter(EngineOp::RegisterTrack)?;
        let mut model = self.model.lock();
        if !model.player_ready {
            return Err(EngineError::NotSetUp);
        }
        model.track = Some(track.clone());
        if model.playback == PlaybackState::None {
            model.playback = PlaybackState::Ready;
        }
        Ok(())
    }

    async fn play(&self) -> EngineResult<()> {
        self.enter(EngineOp::Play)?;

        let hang = {
            let mut faults = self.faults.lock();
            if faults.hanging_plays > 0 {
                faults.hanging_plays -= 1;
                true
            } else {
                false
            }
        };
        if hang {
            std::future::pending::<()>().await;
        }
        self.pass_gate(EngineOp::Play).await;

        let epoch = {
            let mut model = self.model.lock();
            if model.track.is_none() {
                return Err(EngineError::NotSetUp);
            }
            model.epoch += 1;
            model.epoch
        };

        Self::step(&self.model, &self.events, epoch, PlaybackState::Connecting);

        match self.step_delay {
            None => {
                Self::step(&self.model, &self.events, epoch, PlaybackState::Buffering);
                Self::step(&self.model, &self.events, epoch, PlaybackState::Playing);
            }
            Some(delay) => {
                let model = Arc::clone(&self.model);
                let events = self.events.clone();
                tokio::spawn(async move {
                    for state in [PlaybackState::Buffering, PlaybackState::Playing] {
                        tokio::time::sleep(delay).await;
                        if !Self::step(&model, &events, epoch, state) {
                            return;
                        }
                    }
                });
            }
        }
        Ok(())
    }

    async fn pause(&self) -> EngineResult<()> {
        self.enter(EngineOp::Pause)?;
        self.transition(PlaybackState::Paused);
        Ok(())
    }

    async fn stop(&self) -> EngineResult<()> {
        self.enter(EngineOp::Stop)?;
        self.transition(PlaybackState::Stopped);
        Ok(())
    }

    async fn reset(&self) -> EngineResult<()> {
        self.enter(EngineOp::Reset)?;
        {
            let mut model = self.model.lock();
            model.player_ready = false;
            model.track = None;
            model.metadata = None;
        }
        self.transition(PlaybackState::None);
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> EngineResult<()> {
        self.enter(EngineOp::SetVolume)?;
        self.model.lock().volume = volume;
        Ok(())
    }

    async fn get_playback_state(&self) -> EngineResult<PlaybackState> {
        self.enter(EngineOp::GetPlaybackState)?;
        let state = self.model.lock().playback;
        self.pass_gate(EngineOp::GetPlaybackState).await;
        Ok(state)
    }

    async fn update_metadata(
        &self,
        track_id: &str,
        metadata: &TrackMetadata,
    ) -> EngineResult<()> {
        self.enter(EngineOp::UpdateMetadata)?;
        let mut model = self.model.lock();
        match model.track {
            Some(ref track) if track.id == track_id => {
                model.metadata = Some(metadata.clone());
                Ok(())
            }
            _ => Err(EngineError::rejected(
                "update_metadata",
                format!("unknown track {}", track_id),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::track::StationConfig;

    async fn ready_engine() -> SimulatedEngine {
        let engine = SimulatedEngine::new();
        engine.setup_player(&PlayerConfig::default()).await.unwrap();
        engine
            .register_track(&StationConfig::default().to_track())
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn play_walks_to_playing() {
        let engine = ready_engine().await;
        let mut rx = engine.subscribe();

        engine.play().await.unwrap();

        let mut seen = Vec::new();
        while let Ok(EngineEvent::PlaybackState(s)) = rx.try_recv() {
            seen.push(s);
        }
        assert_eq!(
            seen,
            vec![
                PlaybackState::Connecting,
                PlaybackState::Buffering,
                PlaybackState::Playing
            ]
        );
        assert_eq!(engine.playback_state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn register_requires_setup() {
        let engine = SimulatedEngine::new();
        let err = engine
            .register_track(&StationConfig::default().to_track())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::NotSetUp);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed() {
        let engine = ready_engine().await;
        engine.fail_next(EngineOp::Play, 2);

        assert!(engine.play().await.is_err());
        assert!(engine.play().await.is_err());
        assert!(engine.play().await.is_ok());
        assert_eq!(engine.call_count(EngineOp::Play), 3);
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let engine = ready_engine().await;
        engine.set_volume(0.5).await.unwrap();
        engine.stop().await.unwrap();

        assert_eq!(
            engine.calls(),
            vec![
                EngineOp::SetupPlayer,
                EngineOp::RegisterTrack,
                EngineOp::SetVolume,
                EngineOp::Stop
            ]
        );
    }

    #[tokio::test]
    async fn offline_engine_is_unavailable() {
        let engine = ready_engine().await;
        engine.set_offline(true);

        match engine.get_playback_state().await {
            Err(EngineError::Unavailable(reason)) => assert!(reason.contains("offline")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            engine.play().await.unwrap_err().code(),
            "engine_unavailable"
        );

        engine.set_offline(false);
        assert_eq!(
            engine.get_playback_state().await.unwrap(),
            PlaybackState::Ready
        );
    }

    #[tokio::test]
    async fn gated_query_returns_state_read_before_release() {
        let engine = Arc::new(ready_engine().await);
        engine.play().await.unwrap();
        let gate = engine.gate_next(EngineOp::GetPlaybackState);

        let querying = Arc::clone(&engine);
        let handle = tokio::spawn(async move { querying.get_playback_state().await });
        while engine.call_count(EngineOp::GetPlaybackState) == 0 {
            tokio::task::yield_now().await;
        }

        engine.stop().await.unwrap();
        gate.notify_one();

        assert_eq!(handle.await.unwrap().unwrap(), PlaybackState::Playing);
        assert_eq!(engine.playback_state(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn reset_forgets_track() {
        let engine = ready_engine().await;
        engine.play().await.unwrap();
        engine.reset().await.unwrap();

        assert!(engine.registered_track().is_none());
        assert_eq!(engine.playback_state(), PlaybackState::None);
        assert_eq!(engine.play().await.unwrap_err(), EngineError::NotSetUp);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_steps() {
        let engine = SimulatedEngine::with_step_delay(Duration::from_millis(100));
        engine.setup_player(&PlayerConfig::default()).await.unwrap();
        engine
            .register_track(&StationConfig::default().to_track())
            .await
            .unwrap();

        engine.play().await.unwrap();
        assert_eq!(engine.playback_state(), PlaybackState::Connecting);

        engine.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.playback_state(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn metadata_requires_matching_track() {
        let engine = ready_engine().await;
        let meta = StationConfig::default().live_metadata();

        assert!(engine.update_metadata("other", &meta).await.is_err());
        engine
            .update_metadata("radio-kbum-102fm", &meta)
            .await
            .unwrap();
        assert_eq!(engine.metadata(), Some(meta));
    }
}
