//! CLI configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use kbum_core::{SessionConfig, StationConfig};
use serde::Deserialize;

/// Player configuration loaded from YAML with environment overrides.
///
/// ```yaml
/// session:
///   max_retries: 5
///   health_check_interval_ms: 10000
/// station:
///   stream_url: https://example.com/live
/// step_delay_ms: 300
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Retry, timeout, health and volume settings.
    pub session: SessionConfig,

    /// Station and stream descriptor.
    /// Override: `KBUM_STREAM_URL`
    pub station: StationConfig,

    /// Delay between simulated engine connection steps, in milliseconds.
    /// Override: `KBUM_STEP_DELAY_MS`
    pub step_delay_ms: Option<u64>,
}

impl CliConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `KBUM_*` overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let parsed = |key: &str| var(key).and_then(|val| val.parse::<u64>().ok());

        if let Some(retries) = var("KBUM_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.session.max_retries = retries;
        }
        if let Some(timeout) = parsed("KBUM_ATTEMPT_TIMEOUT_MS") {
            self.session.attempt_timeout_ms = timeout;
        }
        if let Some(delay) = parsed("KBUM_RETRY_BASE_DELAY_MS") {
            self.session.retry_base_delay_ms = delay;
        }
        if let Some(interval) = parsed("KBUM_HEALTH_CHECK_INTERVAL_MS") {
            self.session.health_check_interval_ms = interval;
        }
        if let Some(reconnects) = var("KBUM_MAX_RECONNECTS").and_then(|v| v.parse().ok()) {
            self.session.max_reconnects = reconnects;
        }
        if let Some(url) = var("KBUM_STREAM_URL") {
            self.station.stream_url = url;
        }
        if let Some(delay) = parsed("KBUM_STEP_DELAY_MS") {
            self.step_delay_ms = Some(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file() {
        let config = CliConfig::default();
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.station.track_id, "radio-kbum-102fm");
        assert!(config.step_delay_ms.is_none());
    }

    #[test]
    fn loads_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "session:\n  max_retries: 5\n  initial_volume: 0.5\nstep_delay_ms: 250"
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.session.max_retries, 5);
        assert_eq!(config.session.initial_volume, 0.5);
        assert_eq!(config.session.attempt_timeout_ms, 15_000);
        assert_eq!(config.step_delay_ms, Some(250));
        assert_eq!(config.station, StationConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "session: [not, a, map]").unwrap();
        let err = CliConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = CliConfig::default();
        config.apply_env_overrides(env(&[
            ("KBUM_MAX_RETRIES", "7"),
            ("KBUM_HEALTH_CHECK_INTERVAL_MS", "1000"),
            ("KBUM_STREAM_URL", "https://example.com/live"),
            ("KBUM_STEP_DELAY_MS", "50"),
        ]));

        assert_eq!(config.session.max_retries, 7);
        assert_eq!(config.session.health_check_interval_ms, 1_000);
        assert_eq!(config.station.stream_url, "https://example.com/live");
        assert_eq!(config.step_delay_ms, Some(50));
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        let mut config = CliConfig::default();
        config.apply_env_overrides(env(&[
            ("KBUM_MAX_RETRIES", "many"),
            ("KBUM_ATTEMPT_TIMEOUT_MS", "-5"),
        ]));

        assert_eq!(config.session.max_retries, 3);
        assert_eq!(config.session.attempt_timeout_ms, 15_000);
    }
}
