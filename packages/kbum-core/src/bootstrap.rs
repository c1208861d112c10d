//! Session bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where the
//! session and its background services are instantiated and wired together.
//! There is no process-wide singleton: each call builds an independent
//! session around the engine it is given.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::MediaEngine;
use crate::error::{SessionError, SessionResult};
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::runtime::{Sleeper, TokioSleeper, TokioSpawner};
use crate::services::{EngineEventProcessor, HealthMonitor, PlaybackSession};
use crate::state::SessionConfig;
use crate::track::StationConfig;

/// Container for a bootstrapped session and its background services.
#[derive(Clone)]
pub struct BootstrappedSession {
    /// The playback session controller.
    pub session: Arc<PlaybackSession>,
    /// Samples connection health while playback is active.
    pub health_monitor: Arc<HealthMonitor>,
    /// Consumes the engine event channel.
    pub event_processor: Arc<EngineEventProcessor>,
    /// Event bridge for session and health events.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedSession {
    /// Stops background tasks and playback.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to the event pump and the health monitor
        self.cancel_token.cancel();
        self.health_monitor.stop();

        if let Err(e) = self.session.stop().await {
            log::warn!("[Bootstrap] Stop during shutdown failed: {}", e);
        }

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps a session that sleeps on the Tokio timer between retries.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`SessionError::Configuration`] if `config` or `station` is invalid.
pub fn bootstrap_session(
    config: &SessionConfig,
    station: StationConfig,
    engine: Arc<dyn MediaEngine>,
) -> SessionResult<BootstrappedSession> {
    bootstrap_session_with_sleeper(config, station, engine, Arc::new(TokioSleeper))
}

/// Bootstraps a session with an explicit backoff [`Sleeper`].
pub fn bootstrap_session_with_sleeper(
    config: &SessionConfig,
    station: StationConfig,
    engine: Arc<dyn MediaEngine>,
    sleeper: Arc<dyn Sleeper>,
) -> SessionResult<BootstrappedSession> {
    config.validate().map_err(SessionError::Configuration)?;
    station.validate().map_err(SessionError::Configuration)?;

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    // The event bridge fans session and health events out to any listener
    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
    let emitter = Arc::clone(&event_bridge) as Arc<dyn EventEmitter>;

    // Subscribe before anything can reach the engine so no event is missed
    let engine_events = engine.subscribe();

    let session = Arc::new(PlaybackSession::new(
        config,
        station,
        engine,
        Arc::clone(&emitter),
        sleeper,
    ));

    let health_monitor = Arc::new(HealthMonitor::new(
        Arc::clone(&session),
        config,
        Arc::clone(&emitter),
        spawner.clone(),
        cancel_token.clone(),
    ));

    let event_processor = Arc::new(EngineEventProcessor::new(
        Arc::clone(&session),
        Arc::clone(&health_monitor),
        emitter,
        spawner.clone(),
        cancel_token.clone(),
    ));
    event_processor.start(engine_events);

    log::info!(
        "[Bootstrap] Session ready for {} (max_retries={}, health_check={}ms)",
        session.track().url,
        config.max_retries,
        config.health_check_interval_ms
    );

    Ok(BootstrappedSession {
        session,
        health_monitor,
        event_processor,
        event_bridge,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOp, SimulatedEngine};
    use crate::events::{BroadcastEvent, SessionEvent};
    use crate::state::ConnectionQuality;

    fn boot(config: SessionConfig) -> (Arc<SimulatedEngine>, BootstrappedSession) {
        let engine = Arc::new(SimulatedEngine::new());
        let services = bootstrap_session(
            &config,
            StationConfig::default(),
            Arc::clone(&engine) as Arc<dyn MediaEngine>,
        )
        .unwrap();
        (engine, services)
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let engine = Arc::new(SimulatedEngine::new());
        let config = SessionConfig {
            health_check_interval_ms: 0,
            ..Default::default()
        };
        let err = bootstrap_session(&config, StationConfig::default(), engine)
            .err()
            .unwrap();
        assert_eq!(err.code(), "configuration_error");
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_reaches_playing() {
        let (_engine, services) = boot(SessionConfig::default());
        let mut sub = services.session.subscribe();

        services.session.play().await.unwrap();
        let snapshot = sub.wait_for(|s| s.is_playing).await.unwrap();

        assert!(!snapshot.is_loading);
        assert!(snapshot.error.is_none());
        assert_eq!(services.session.state().retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn two_failures_then_success() {
        let (engine, services) = boot(SessionConfig::default());
        engine.fail_next(EngineOp::Play, 2);
        let mut events = services.event_bridge.subscribe();
        let mut sub = services.session.subscribe();

        services.session.play().await.unwrap();
        sub.wait_for(|s| s.is_playing).await.unwrap();

        assert_eq!(services.session.state().retry_count, 2);

        let mut delays = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let BroadcastEvent::Session(SessionEvent::RetryScheduled { delay_ms, .. }) = event {
                delays.push(delay_ms);
            }
        }
        assert_eq!(delays, vec![2_000, 4_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn four_failures_exhaust_the_budget() {
        let (engine, services) = boot(SessionConfig::default());
        engine.fail_next(EngineOp::Play, 4);

        let err = services.session.play().await.unwrap_err();
        assert_eq!(err.code(), "connection_exhausted");

        let snapshot = services.session.snapshot();
        assert!(!snapshot.is_playing);
        assert!(!snapshot.is_loading);
        assert!(snapshot.error.is_some());
        assert_eq!(engine.call_count(EngineOp::Play), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_then_mute_twice() {
        let (engine, services) = boot(SessionConfig::default());
        let session = &services.session;

        session.set_volume(0.6).await.unwrap();
        session.toggle_mute().await.unwrap();
        let muted = session.snapshot();
        assert!(muted.is_muted);
        assert_eq!(muted.volume, 0.0);

        session.toggle_mute().await.unwrap();
        let restored = session.snapshot();
        assert!(!restored.is_muted);
        assert_eq!(restored.volume, 0.6);
        assert_eq!(engine.volume(), 0.6);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_playback_and_monitor() {
        let (engine, services) = boot(SessionConfig::default());
        let mut sub = services.session.subscribe();
        services.session.play().await.unwrap();
        sub.wait_for(|s| s.is_playing).await.unwrap();
        assert!(services.health_monitor.is_running());

        services.shutdown().await;

        assert!(!services.health_monitor.is_running());
        assert_eq!(engine.call_count(EngineOp::Stop), 1);
        assert_eq!(
            services.session.snapshot().connection_quality,
            ConnectionQuality::Offline
        );
    }
}
