//! Engine event processing service.
//!
//! Responsibilities:
//! - Applying engine playback-state events to the session in emission order
//! - Starting and stopping the health monitor as playback becomes active/inactive
//! - Dispatching media-center remote commands to the session
//! - Refreshing the "live" lock-screen metadata once audio is playing

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineEvent, PlaybackState};
use crate::events::{EventEmitter, RemoteCommand, SessionEvent};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::health_monitor::HealthMonitor;
use crate::services::playback_session::PlaybackSession;
use crate::utils::now_millis;

/// Dependencies shared by the pump task and the tasks it spawns.
#[derive(Clone)]
struct ProcessorDeps {
    session: Arc<PlaybackSession>,
    monitor: Arc<HealthMonitor>,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
}

/// Single consumer of the engine event channel.
pub struct EngineEventProcessor {
    deps: ProcessorDeps,
    cancel: CancellationToken,
}

impl EngineEventProcessor {
    pub fn new(
        session: Arc<PlaybackSession>,
        monitor: Arc<HealthMonitor>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            deps: ProcessorDeps {
                session,
                monitor,
                emitter,
                spawner,
            },
            cancel,
        }
    }

    /// Spawns the pump task consuming `rx` until cancelled or the engine
    /// drops its sender.
    pub fn start(&self, mut rx: broadcast::Receiver<EngineEvent>) {
        let deps = self.deps.clone();
        let cancel = self.cancel.clone();

        self.deps.spawner.spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = rx.recv() => result,
                };
                match event {
                    Ok(event) => Self::process_event(&deps, event),
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("[EngineEventProcessor] Lagged, {} events dropped", skipped);
                    }
                    Err(RecvError::Closed) => {
                        log::info!("[EngineEventProcessor] Engine event channel closed");
                        break;
                    }
                }
            }
            log::debug!("[EngineEventProcessor] Pump exited");
        });
    }

    /// Applies one engine event. State changes are synchronous; anything that
    /// awaits the engine runs on its own task.
    fn process_event(deps: &ProcessorDeps, event: EngineEvent) {
        match event {
            EngineEvent::PlaybackState(state) => {
                log::debug!("[EngineEventProcessor] Playback state -> {:?}", state);
                deps.session.apply_engine_state(state);

                if deps.session.is_active() {
                    deps.monitor.start();
                } else {
                    deps.monitor.stop();
                }

                if state == PlaybackState::Playing {
                    let session = Arc::clone(&deps.session);
                    deps.spawner.spawn(async move {
                        if let Err(e) = session.refresh_live_metadata().await {
                            log::warn!("[EngineEventProcessor] Metadata refresh failed: {}", e);
                        }
                    });
                }
            }
            EngineEvent::RemotePlay => Self::dispatch_remote(deps, RemoteCommand::Play),
            EngineEvent::RemotePause => Self::dispatch_remote(deps, RemoteCommand::Pause),
            EngineEvent::RemoteStop => Self::dispatch_remote(deps, RemoteCommand::Stop),
            EngineEvent::PlaybackError(message) => {
                log::error!("[EngineEventProcessor] Engine playback error: {}", message);
                deps.session.record_engine_error(&message);
            }
            EngineEvent::QueueEnded => {
                log::info!("[EngineEventProcessor] Queue ended");
            }
        }
    }

    fn dispatch_remote(deps: &ProcessorDeps, command: RemoteCommand) {
        log::info!("[EngineEventProcessor] Remote command: {:?}", command);
        deps.emitter.emit_session(SessionEvent::RemoteCommand {
            command,
            timestamp: now_millis(),
        });

        let session = Arc::clone(&deps.session);
        deps.spawner.spawn(async move {
            let result = match command {
                RemoteCommand::Play => session.play().await,
                RemoteCommand::Pause => session.pause().await,
                RemoteCommand::Stop => session.stop().await,
            };
            if let Err(e) = result {
                log::warn!(
                    "[EngineEventProcessor] Remote {:?} failed: {}",
                    command,
                    e
                );
            }
        });
    }
}
