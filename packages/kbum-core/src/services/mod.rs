//! Application services layer.
//!
//! This module contains the session controller and the background services
//! that keep it in sync with the media engine.

pub mod engine_event_processor;
pub mod health_monitor;
pub mod observer;
pub mod playback_session;
pub mod retry;

pub use engine_event_processor::EngineEventProcessor;
pub use health_monitor::HealthMonitor;
pub use observer::SessionSubscription;
pub use playback_session::PlaybackSession;
pub use retry::{RetryPolicy, RetryStep};
