//! Application-level configuration loading, including the tournament stages offered to operators.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use indexmap::IndexSet;
use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_BACK_CONFIG_PATH";
/// Capacity of the match event broadcast channel when none is configured.
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    stages: IndexSet<String>,
    event_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in stages.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        stages = app_config.stages.len(),
                        "loaded match stages from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Stages in display order.
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(String::as_str)
    }

    /// Stage assigned when a match is created without one.
    pub fn default_stage(&self) -> &str {
        self.stages
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_STAGE)
    }

    /// Whether `stage` is one of the configured stages.
    pub fn is_known_stage(&self, stage: &str) -> bool {
        self.stages.contains(stage)
    }

    /// Capacity of the broadcast channel feeding SSE and WebSocket viewers.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Stage used if the configured list is empty.
const FALLBACK_STAGE: &str = "Friendly";

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    stages: Vec<String>,
    #[serde(default)]
    event_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let stages = value
            .stages
            .into_iter()
            .map(|stage| stage.trim().to_string())
            .filter(|stage| !stage.is_empty())
            .collect::<IndexSet<_>>();

        Self {
            stages: if stages.is_empty() {
                default_stages()
            } else {
                stages
            },
            event_capacity: value
                .event_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_EVENT_CAPACITY),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in stages shipped with the binary.
fn default_stages() -> IndexSet<String> {
    [
        FALLBACK_STAGE,
        "Group stage",
        "Round of 64",
        "Round of 32",
        "Round of 16",
        "Quarter-final",
        "Semi-final",
        "Final",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_with_friendly() {
        let config = AppConfig::default();
        assert_eq!(config.default_stage(), "Friendly");
        assert!(config.is_known_stage("Final"));
        assert!(!config.is_known_stage("final"));
        assert_eq!(config.stages().count(), 8);
        assert_eq!(config.event_capacity(), DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn raw_config_keeps_order_and_drops_duplicates() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "stages": ["Final", " Semi-final ", "Final", ""], "event_capacity": 8 }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(
            config.stages().collect::<Vec<_>>(),
            vec!["Final", "Semi-final"]
        );
        assert_eq!(config.default_stage(), "Final");
        assert_eq!(config.event_capacity(), 8);
    }

    #[test]
    fn empty_raw_config_falls_back_to_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{ "event_capacity": 0 }"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.default_stage(), "Friendly");
        assert_eq!(config.event_capacity(), DEFAULT_EVENT_CAPACITY);
    }
}
