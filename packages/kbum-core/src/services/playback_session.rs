//! Playback session controller.
//!
//! Responsibilities:
//! - Idempotent engine setup and track registration
//! - Play with bounded, linearly backed-off retries
//! - Pause / stop pass-through
//! - Volume and mute with restore-on-unmute
//! - Buffer-health bookkeeping for the health monitor
//! - Publishing snapshots to subscribers on every change
//!
//! All state lives in one [`SessionState`] behind a mutex that is never held
//! across an `.await`, so each multi-field update is applied atomically.
//! Snapshots are published after that mutex is released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::engine::{MediaEngine, PlaybackState, PlayerConfig};
use crate::error::{EngineResult, SessionError, SessionResult};
use crate::events::{EventEmitter, SessionEvent};
use crate::runtime::Sleeper;
use crate::services::observer::SessionSubscription;
use crate::services::retry::{RetryPolicy, RetryStep};
use crate::state::{buffer_health_for, SessionConfig, SessionSnapshot, SessionState};
use crate::track::{StationConfig, Track};
use crate::utils::{clamp_volume, now_millis};

/// Stateful controller wrapping the media engine for the single station.
pub struct PlaybackSession {
    engine: Arc<dyn MediaEngine>,
    station: StationConfig,
    track: Track,
    player_config: PlayerConfig,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    state: Mutex<SessionState>,
    /// Bumped under the state lock on every update.
    revision: AtomicU64,
    /// Highest revision handed to the watch channel.
    published_revision: AtomicU64,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    emitter: Arc<dyn EventEmitter>,
    sleeper: Arc<dyn Sleeper>,
    /// Serializes setup so concurrent callers never register the track twice.
    setup_lock: tokio::sync::Mutex<()>,
    /// Cancelled and replaced by every `stop()`. Play calls and health
    /// samples hold the one current when they started.
    stop_token: Mutex<CancellationToken>,
}

impl PlaybackSession {
    /// Creates a new session. Nothing is sent to the engine until the first
    /// `setup()` or `play()`.
    ///
    /// # Arguments
    /// * `config` - Retry, timeout and initial volume settings (assumed validated)
    /// * `station` - Station descriptor the track is built from
    /// * `engine` - Media engine to drive
    /// * `emitter` - Sink for session events
    /// * `sleeper` - Delay source for retry backoff
    pub fn new(
        config: &SessionConfig,
        station: StationConfig,
        engine: Arc<dyn MediaEngine>,
        emitter: Arc<dyn EventEmitter>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let state = SessionState::new(config);
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        Self {
            engine,
            track: station.to_track(),
            station,
            player_config: PlayerConfig::default(),
            policy: RetryPolicy::new(config.max_retries, config.retry_base_delay()),
            attempt_timeout: config.attempt_timeout(),
            state: Mutex::new(state),
            revision: AtomicU64::new(0),
            published_revision: AtomicU64::new(0),
            snapshot_tx,
            emitter,
            sleeper,
            setup_lock: tokio::sync::Mutex::new(()),
            stop_token: Mutex::new(CancellationToken::new()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Returns a copy of the full session state.
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot()
    }

    /// True while audible or while working towards it.
    pub fn is_active(&self) -> bool {
        self.state.lock().is_active()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.snapshot_tx.subscribe())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State publication
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies `mutate` under the state lock and publishes the snapshot if it changed.
    ///
    /// Publishing happens after the state lock is released, so subscriber
    /// callbacks may call back into the session. A snapshot older than the
    /// last published one is dropped.
    fn update<R>(&self, mutate: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, snapshot, revision) = {
            let mut state = self.state.lock();
            let result = mutate(&mut state);
            let revision = self.revision.fetch_add(1, Ordering::Relaxed) + 1;
            (result, state.snapshot(), revision)
        };

        // The closure runs under the channel's write lock, which orders publishers
        let changed = self.snapshot_tx.send_if_modified(|current| {
            if revision <= self.published_revision.load(Ordering::Relaxed) {
                return false;
            }
            self.published_revision.store(revision, Ordering::Relaxed);
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });

        if changed {
            self.emitter.emit_session(SessionEvent::StateChanged {
                snapshot,
                timestamp: now_millis(),
            });
        }
        result
    }

    /// Records a surfaced failure as the view error and hands it back.
    fn fail(&self, error: SessionError) -> SessionError {
        log::error!("[PlaybackSession] {}", error);
        let message = error.to_string();
        self.update(|s| s.error = Some(message));
        error
    }

    fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────

    /// Configures the engine and registers the live track. No-op once done.
    ///
    /// On failure the setup flag stays clear so the next call starts over.
    pub async fn setup(&self) -> SessionResult<()> {
        let _guard = self.setup_lock.lock().await;
        if self.state.lock().setup_complete {
            return Ok(());
        }

        self.engine
            .setup_player(&self.player_config)
            .await
            .map_err(|e| SessionError::EngineSetup(e.to_string()))?;
        self.engine
            .register_track(&self.track)
            .await
            .map_err(|e| SessionError::EngineSetup(e.to_string()))?;

        self.update(|s| s.setup_complete = true);
        log::info!(
            "[PlaybackSession] Player ready with track {} ({})",
            self.track.id,
            self.track.url
        );
        Ok(())
    }

    /// Stops and tears down the engine session so the next setup starts clean.
    ///
    /// Failures are logged only. The setup flag is cleared only if the engine
    /// actually reset.
    pub async fn reset_connection(&self) {
        if let Err(e) = self.engine.stop().await {
            log::warn!("[PlaybackSession] Stop during reset failed: {}", e);
        }
        match self.engine.reset().await {
            Ok(()) => {
                self.update(|s| s.setup_complete = false);
                log::debug!("[PlaybackSession] Engine session reset");
            }
            Err(e) => log::warn!("[PlaybackSession] Engine reset failed: {}", e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts playback, retrying failed attempts with linear backoff.
    ///
    /// `Ok` means the engine accepted a play command; the audible `Playing`
    /// state arrives later through the engine event stream.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ConnectionExhausted`] once every attempt failed
    /// - [`SessionError::Interrupted`] if `stop()` was called meanwhile
    pub async fn play(&self) -> SessionResult<()> {
        let interrupt = self.stop_token.lock().clone();
        self.update(SessionState::begin_play);
        log::info!("[PlaybackSession] Starting playback of {}", self.track.url);

        let result = self.run_attempts(&interrupt).await;
        self.update(SessionState::end_play);

        match result {
            Ok(()) => {
                log::info!("[PlaybackSession] Play command accepted");
                Ok(())
            }
            Err(SessionError::Interrupted) => {
                log::info!("[PlaybackSession] Playback start interrupted by stop");
                Err(SessionError::Interrupted)
            }
            Err(e) => {
                self.emitter.emit_session(SessionEvent::PlaybackFailed {
                    error: e.to_string(),
                    code: e.code(),
                    timestamp: now_millis(),
                });
                Err(self.fail(e))
            }
        }
    }

    /// Drives the retry state machine until it reaches a terminal state.
    ///
    /// The retry budget belongs to this call; concurrent plays never reset it.
    async fn run_attempts(&self, interrupt: &CancellationToken) -> SessionResult<()> {
        let mut retries = 0;
        loop {
            let outcome = self.attempt().await;

            if interrupt.is_cancelled() {
                if outcome.is_ok() {
                    // The engine accepted play after the user stopped
                    if let Err(e) = self.engine.stop().await {
                        log::warn!("[PlaybackSession] Stop after interrupted play failed: {}", e);
                    }
                }
                return Err(SessionError::Interrupted);
            }

            match self.policy.next_step(retries, outcome.is_ok()) {
                RetryStep::Succeeded => return Ok(()),
                RetryStep::Failed { attempts } => {
                    return Err(SessionError::ConnectionExhausted {
                        attempts,
                        last_error: describe_failure(outcome),
                    });
                }
                RetryStep::Retrying { retry_count, delay } => {
                    let error = describe_failure(outcome);
                    log::warn!(
                        "[PlaybackSession] Play attempt failed: {}. Retry {}/{} in {}ms",
                        error,
                        retry_count,
                        self.policy.max_retries(),
                        delay.as_millis()
                    );
                    retries = retry_count;
                    self.update(|s| s.retry_count = retry_count);
                    self.emitter.emit_session(SessionEvent::RetryScheduled {
                        retry_count,
                        max_retries: self.policy.max_retries(),
                        delay_ms: delay.as_millis() as u64,
                        error,
                        timestamp: now_millis(),
                    });

                    tokio::select! {
                        biased;
                        _ = interrupt.cancelled() => return Err(SessionError::Interrupted),
                        _ = self.sleeper.sleep(delay) => {}
                    }

                    self.reset_connection().await;
                    if interrupt.is_cancelled() {
                        return Err(SessionError::Interrupted);
                    }
                }
            }
        }
    }

    /// One attempt: ensure setup, then race the play command against the timeout.
    async fn attempt(&self) -> SessionResult<()> {
        self.setup().await?;
        match tokio::time::timeout(self.attempt_timeout, self.engine.play()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Playback(e.to_string())),
            Err(_) => Err(SessionError::ConnectionTimeout {
                timeout_ms: self.attempt_timeout.as_millis() as u64,
            }),
        }
    }

    pub async fn pause(&self) -> SessionResult<()> {
        self.clear_error();
        self.engine
            .pause()
            .await
            .map_err(|e| self.fail(SessionError::Playback(e.to_string())))
    }

    /// Stops playback and interrupts any play call still retrying.
    ///
    /// Buffer health drops to 0 (offline) even if the engine rejects the
    /// command, since no health signal is meaningful after an explicit stop.
    pub async fn stop(&self) -> SessionResult<()> {
        self.clear_error();
        let previous = std::mem::replace(&mut *self.stop_token.lock(), CancellationToken::new());
        previous.cancel();

        let result = self.engine.stop().await;
        self.update(|s| s.set_buffer_health(0));
        result.map_err(|e| self.fail(SessionError::Playback(e.to_string())))
    }

    /// Pauses if the last known state is playing, plays otherwise.
    pub async fn toggle_playback(&self) -> SessionResult<()> {
        let playing = self.state.lock().is_playing;
        if playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Full reconnect: reset the engine session, set up again and play.
    pub async fn reconnect(&self) -> SessionResult<()> {
        log::info!("[PlaybackSession] Reconnecting to {}", self.track.url);
        self.reset_connection().await;
        self.play().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Volume
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets the output level, clamped to `[0, 1]`.
    ///
    /// A nonzero level clears mute; zero mutes like [`toggle_mute`](Self::toggle_mute).
    pub async fn set_volume(&self, volume: f32) -> SessionResult<()> {
        self.clear_error();
        let volume = clamp_volume(volume);
        if let Err(e) = self.engine.set_volume(volume).await {
            return Err(self.fail(SessionError::VolumeChange(e.to_string())));
        }
        self.update(|s| s.apply_volume(volume));
        log::debug!("[PlaybackSession] Volume set to {:.2}", volume);
        Ok(())
    }

    /// Mutes (remembering the level) or unmutes (restoring it).
    pub async fn toggle_mute(&self) -> SessionResult<()> {
        self.clear_error();
        let (target, mute) = {
            let state = self.state.lock();
            (state.mute_toggle_target(), !state.muted)
        };
        if let Err(e) = self.engine.set_volume(target).await {
            return Err(self.fail(SessionError::MuteToggle(e.to_string())));
        }
        self.update(|s| s.apply_mute(mute));
        log::debug!(
            "[PlaybackSession] {} (volume {:.2})",
            if mute { "Muted" } else { "Unmuted" },
            target
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Engine feedback (event processor and health monitor)
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies a playback-state event from the engine.
    pub fn apply_engine_state(&self, state: PlaybackState) {
        self.update(|s| s.apply_engine_state(state));
    }

    /// Records an engine-reported playback error and degrades to offline.
    pub fn record_engine_error(&self, message: &str) {
        self.update(|s| {
            s.error = Some(message.to_string());
            s.set_buffer_health(0);
        });
    }

    /// Queries the engine for its current playback state.
    pub async fn query_engine_state(&self) -> EngineResult<PlaybackState> {
        self.engine.get_playback_state().await
    }

    /// Token identifying the current stop generation. It is cancelled by the
    /// next `stop()`.
    pub fn stop_generation(&self) -> CancellationToken {
        self.stop_token.lock().clone()
    }

    /// Stores the buffer health for a sampled engine state and returns it.
    ///
    /// `generation` is the [`stop_generation`](Self::stop_generation) taken
    /// before the engine was queried. The sample is discarded (`None`) if a
    /// `stop()` happened since or playback is no longer active, so a stale
    /// reading never overrides the offline state a stop forces.
    /// A `Playing` sample restores the full reconnect budget.
    pub fn record_health_sample(
        &self,
        state: PlaybackState,
        generation: &CancellationToken,
    ) -> Option<u8> {
        self.update(|s| {
            if generation.is_cancelled() || !s.is_active() {
                return None;
            }
            s.set_buffer_health(buffer_health_for(state));
            if state == PlaybackState::Playing {
                s.reconnect_count = 0;
            }
            Some(s.buffer_health)
        })
    }

    /// Degrades connection quality to offline after a failed sample.
    pub fn mark_offline(&self) {
        self.update(|s| s.set_buffer_health(0));
    }

    /// Takes one reconnect from the monitor budget, if any is left.
    pub fn reserve_reconnect(&self) -> Option<u32> {
        self.update(SessionState::reserve_reconnect)
    }

    /// Pushes the "live" metadata to the media center.
    pub async fn refresh_live_metadata(&self) -> EngineResult<()> {
        self.engine
            .update_metadata(&self.track.id, &self.station.live_metadata())
            .await
    }
}

fn describe_failure(outcome: SessionResult<()>) -> String {
    outcome.err().map(|e| e.to_string()).unwrap_or_default()
}
