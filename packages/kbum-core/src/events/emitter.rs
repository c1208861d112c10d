//! Event emitter abstraction for decoupling services from transport.
//!
//! Services depend on the [`EventEmitter`] trait rather than concrete broadcast
//! channels, enabling testing and alternative transport implementations.

use super::{HealthEvent, SessionEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn do_something(&self) {
///         self.emitter.emit_session(SessionEvent::PlaybackFailed { ... });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a playback session event.
    fn emit_session(&self, event: SessionEvent);

    /// Emits a connection health event.
    fn emit_health(&self, event: HealthEvent);
}

/// No-op emitter for embedded use or testing.
///
/// Events are silently discarded. Observers that only need state use the
/// snapshot subscription instead.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_session(&self, _event: SessionEvent) {}

    fn emit_health(&self, _event: HealthEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_session(&self, event: SessionEvent) {
        tracing::debug!(?event, "session_event");
    }

    fn emit_health(&self, event: HealthEvent) {
        tracing::debug!(?event, "health_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RemoteCommand;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events.
    struct CountingEventEmitter {
        session_count: AtomicUsize,
        health_count: AtomicUsize,
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_session(&self, _event: SessionEvent) {
            self.session_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_health(&self, _event: HealthEvent) {
            self.health_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter {
            session_count: AtomicUsize::new(0),
            health_count: AtomicUsize::new(0),
        });
        let dyn_emitter: Arc<dyn EventEmitter> = emitter.clone();

        dyn_emitter.emit_session(SessionEvent::RemoteCommand {
            command: RemoteCommand::Play,
            timestamp: 0,
        });
        dyn_emitter.emit_health(HealthEvent::SampleFailed {
            error: "boom".to_string(),
            timestamp: 0,
        });
        dyn_emitter.emit_health(HealthEvent::SampleFailed {
            error: "boom".to_string(),
            timestamp: 1,
        });

        assert_eq!(emitter.session_count.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.health_count.load(Ordering::SeqCst), 2);
    }
}
