//! Station descriptor and the single live track built from it.

use serde::{Deserialize, Serialize};

use crate::constants::{
    STATION_ALBUM, STATION_ARTIST, STATION_DESCRIPTION, STATION_GENRE, STATION_LIVE_LABEL,
    STATION_STREAM_URL, STATION_TITLE, STATION_TRACK_ID, STATION_USER_AGENT,
};

/// Static configuration for the one station this player serves.
///
/// All fields default to the Kbum 102.7 FM values, so an empty config
/// section yields the production station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Track identifier registered with the engine.
    pub track_id: String,
    /// Live stream URL. Consumed by the engine, never parsed here.
    pub stream_url: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub description: String,
    /// Optional artwork URL for the media center.
    pub artwork: Option<String>,
    /// Artist label pushed to the media center once audio is flowing.
    pub live_label: String,
    /// User agent sent with stream requests.
    pub user_agent: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            track_id: STATION_TRACK_ID.to_string(),
            stream_url: STATION_STREAM_URL.to_string(),
            title: STATION_TITLE.to_string(),
            artist: STATION_ARTIST.to_string(),
            album: STATION_ALBUM.to_string(),
            genre: STATION_GENRE.to_string(),
            description: STATION_DESCRIPTION.to_string(),
            artwork: None,
            live_label: STATION_LIVE_LABEL.to_string(),
            user_agent: STATION_USER_AGENT.to_string(),
        }
    }
}

impl StationConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.track_id.trim().is_empty() {
            return Err("track_id must not be empty".to_string());
        }
        if !(self.stream_url.starts_with("http://") || self.stream_url.starts_with("https://")) {
            return Err(format!(
                "stream_url must be an http(s) URL, got {:?}",
                self.stream_url
            ));
        }
        Ok(())
    }

    /// Builds the immutable track descriptor for this station.
    pub fn to_track(&self) -> Track {
        Track {
            id: self.track_id.clone(),
            url: self.stream_url.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            genre: self.genre.clone(),
            description: self.description.clone(),
            artwork: self.artwork.clone(),
            is_live_stream: true,
            headers: vec![
                ("User-Agent".to_string(), self.user_agent.clone()),
                ("Connection".to_string(), "keep-alive".to_string()),
                ("Cache-Control".to_string(), "no-cache".to_string()),
            ],
        }
    }

    /// Metadata shown by the media center while the stream is playing.
    pub fn live_metadata(&self) -> TrackMetadata {
        TrackMetadata {
            title: self.title.clone(),
            artist: self.live_label.clone(),
            artwork: self.artwork.clone(),
        }
    }
}

/// Descriptor of the live stream registered with the engine.
///
/// Constructed once at session creation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub url: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
    pub is_live_stream: bool,
    /// HTTP headers for the stream request, in send order.
    pub headers: Vec<(String, String)>,
}

impl Track {
    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Now-playing metadata pushed to the media center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
}
