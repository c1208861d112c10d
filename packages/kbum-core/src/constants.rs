//! Fixed constants for the Kbum 102.7 FM session.
//!
//! Station descriptor defaults, buffer-health heuristics and the connection
//! quality table. Tunable timings live in [`SessionConfig`](crate::state::SessionConfig).

// ─────────────────────────────────────────────────────────────────────────────
// Station
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier under which the live track is registered with the engine.
pub const STATION_TRACK_ID: &str = "radio-kbum-102fm";

/// Live stream endpoint for the station.
pub const STATION_STREAM_URL: &str = "https://srv946411.hstgr.cloud/listen/kbum_102/live";

/// Display title shown by the media center.
pub const STATION_TITLE: &str = "Rádio Kbum 102.7 FM";

/// Display artist shown before playback starts.
pub const STATION_ARTIST: &str = "Ao Vivo";

/// Display album.
pub const STATION_ALBUM: &str = "Transmissão ao Vivo";

/// Display genre.
pub const STATION_GENRE: &str = "Música Popular";

/// Long description for the media center.
pub const STATION_DESCRIPTION: &str = "A sua rádio favorita tocando os melhores sucessos!";

/// Artist label pushed to the media center once the stream is audible.
pub const STATION_LIVE_LABEL: &str = "🔴 AO VIVO";

/// User agent sent with every stream request.
pub const STATION_USER_AGENT: &str = "RadioKbum102FM/1.0";

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum cache size requested from the engine (kilobytes).
pub const ENGINE_MAX_CACHE_SIZE_KB: u32 = 50_000;

/// Interval at which the engine reports progress (seconds).
pub const ENGINE_PROGRESS_UPDATE_INTERVAL_SECS: u32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Buffer Health
// ─────────────────────────────────────────────────────────────────────────────

/// Buffer health reported while the engine is playing.
pub const BUFFER_HEALTH_PLAYING: u8 = 100;

/// Buffer health reported while the engine is buffering.
pub const BUFFER_HEALTH_BUFFERING: u8 = 50;

/// Buffer health reported while the engine is connecting.
pub const BUFFER_HEALTH_CONNECTING: u8 = 25;

/// Buffer health for every other engine state.
pub const BUFFER_HEALTH_NONE: u8 = 0;

// ─────────────────────────────────────────────────────────────────────────────
// Connection Quality
// ─────────────────────────────────────────────────────────────────────────────

/// Minimum buffer health classified as excellent.
pub const QUALITY_EXCELLENT_MIN: u8 = 80;

/// Minimum buffer health classified as good.
pub const QUALITY_GOOD_MIN: u8 = 60;

/// Minimum buffer health classified as poor. Anything below is offline.
pub const QUALITY_POOR_MIN: u8 = 30;
