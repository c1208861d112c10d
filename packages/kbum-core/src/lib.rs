//! Kbum Core - playback session library for the Rádio Kbum 102.7 FM live stream.
//!
//! This crate wraps an external media engine behind a single stateful session
//! controller. It is used by the headless `kbum` CLI and can be embedded by
//! any front end that provides a [`MediaEngine`](engine::MediaEngine).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`engine`]: Media engine boundary and the in-process simulated engine
//! - [`services`]: Playback session, retry policy, health monitor, event processor
//! - [`events`]: Domain events and their emitters
//! - [`state`]: Session configuration, state and observer snapshots
//! - [`track`]: Station descriptor and the live track built from it
//! - [`runtime`]: Task spawning and backoff sleeping abstractions
//! - [`bootstrap`]: Composition root
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`MediaEngine`](engine::MediaEngine): The audio engine being driven
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`Sleeper`](runtime::Sleeper): Delays between retry attempts
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod runtime;
pub mod services;
pub mod state;
pub mod track;
pub mod utils;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_session, bootstrap_session_with_sleeper, BootstrappedSession};
pub use engine::{EngineEvent, MediaEngine, PlaybackState, SimulatedEngine};
pub use error::{EngineError, EngineResult, ErrorCode, SessionError, SessionResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, EventEmitter, HealthEvent, RemoteCommand, SessionEvent,
};
pub use runtime::{Sleeper, TaskSpawner, TokioSleeper, TokioSpawner};
pub use services::{HealthMonitor, PlaybackSession, SessionSubscription};
pub use state::{ConnectionQuality, SessionConfig, SessionSnapshot, SessionState};
pub use track::{StationConfig, Track, TrackMetadata};
