//! Media engine boundary.
//!
//! - [`MediaEngine`]: the capability set consumed by the session
//! - [`types`]: playback states, player configuration and engine events
//! - [`SimulatedEngine`]: scriptable in-process implementation

pub mod simulated;
pub mod traits;
pub mod types;

pub use simulated::{EngineOp, SimulatedEngine};
pub use traits::MediaEngine;
pub use types::{AppKilledBehavior, Capability, EngineEvent, PlaybackState, PlayerConfig};
