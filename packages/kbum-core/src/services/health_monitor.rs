//! Connection health monitoring.
//!
//! Responsibilities:
//! - Periodically sampling the engine playback state while playback is active
//! - Translating samples into buffer health and connection quality
//! - Triggering a bounded number of reconnects when a playing stream degrades

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{EventEmitter, HealthEvent};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::playback_session::PlaybackSession;
use crate::state::SessionConfig;
use crate::utils::now_millis;

/// Timer task that samples the engine and reconnects unhealthy streams.
///
/// Started and stopped by the engine event processor as playback becomes
/// active or inactive. Ticks run one after another; a tick that outlasts the
/// interval causes the missed ticks to be skipped.
pub struct HealthMonitor {
    session: Arc<PlaybackSession>,
    interval: Duration,
    low_buffer_threshold: u8,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
    /// Parent token; cancelling it stops the monitor for good.
    shutdown: CancellationToken,
    /// Token of the running loop, if any.
    running: Mutex<Option<CancellationToken>>,
    in_flight: AtomicBool,
}

impl HealthMonitor {
    pub fn new(
        session: Arc<PlaybackSession>,
        config: &SessionConfig,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session,
            interval: config.health_check_interval(),
            low_buffer_threshold: config.low_buffer_threshold,
            emitter,
            spawner,
            shutdown,
            running: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// True while the sampling loop is scheduled.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Starts the sampling loop. No-op if it is already running.
    pub fn start(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let token = {
            let mut running = self.running.lock();
            if running.as_ref().is_some_and(|t| !t.is_cancelled()) {
                return;
            }
            let token = self.shutdown.child_token();
            *running = Some(token.clone());
            token
        };

        log::debug!(
            "[HealthMonitor] Started (interval {}ms)",
            self.interval.as_millis()
        );

        let monitor = Arc::clone(self);
        let period = self.interval;
        self.spawner.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                monitor.tick().await;
            }
            log::debug!("[HealthMonitor] Loop exited");
        });
    }

    /// Stops the sampling loop. A tick already running finishes first.
    pub fn stop(&self) {
        if let Some(token) = self.running.lock().take() {
            if !token.is_cancelled() {
                token.cancel();
                log::debug!("[HealthMonitor] Stopped");
            }
        }
    }

    /// Runs one health check.
    pub async fn tick(&self) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("[HealthMonitor] Previous check still running, skipping tick");
            return;
        }
        self.check().await;
        self.in_flight.store(false, Ordering::Release);
    }

    async fn check(&self) {
        if !self.session.is_active() {
            self.stop();
            return;
        }

        let generation = self.session.stop_generation();
        let state = match self.session.query_engine_state().await {
            Ok(state) => state,
            Err(e) => {
                log::warn!("[HealthMonitor] Failed to sample playback state: {}", e);
                self.session.mark_offline();
                self.emitter.emit_health(HealthEvent::SampleFailed {
                    error: e.to_string(),
                    timestamp: now_millis(),
                });
                return;
            }
        };

        let Some(buffer_health) = self.session.record_health_sample(state, &generation) else {
            log::debug!("[HealthMonitor] Discarding {:?} sample, playback stopped meanwhile", state);
            return;
        };
        let snapshot = self.session.snapshot();
        self.emitter.emit_health(HealthEvent::Sampled {
            state,
            buffer_health,
            quality: snapshot.connection_quality,
            timestamp: now_millis(),
        });

        if !snapshot.is_playing || buffer_health >= self.low_buffer_threshold {
            return;
        }

        let Some(reconnect_count) = self.session.reserve_reconnect() else {
            log::warn!(
                "[HealthMonitor] Buffer health {} but reconnect budget is spent",
                buffer_health
            );
            return;
        };

        log::warn!(
            "[HealthMonitor] Buffer health {} below {}, reconnecting ({})",
            buffer_health,
            self.low_buffer_threshold,
            reconnect_count
        );
        self.emitter.emit_health(HealthEvent::ReconnectTriggered {
            reconnect_count,
            buffer_health,
            timestamp: now_millis(),
        });

        if let Err(e) = self.session.reconnect().await {
            log::error!("[HealthMonitor] Reconnect failed: {}", e);
        }
    }
}
