use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_RECENT_TRIPS: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub default_trip: Option<PathBuf>,
    pub max_recent_trips: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            default_trip: None,
            max_recent_trips: DEFAULT_MAX_RECENT_TRIPS,
        }
    }
}

impl Config {
    /// Loads `config.toml` from the state directory; a missing file is all defaults.
    pub fn load(state_dir: &Path) -> Result<Self, ConfigError> {
        let path = state_dir.join(CONFIG_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{Config, ConfigError};

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config::load(dir.path()).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.max_recent_trips, 50);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("config.toml"),
            "log_level = \"debug\"\ndefault_trip = \"/trips/japan.trip\"\n",
        )
        .expect("write");

        let config = Config::load(dir.path()).expect("load");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.default_trip, Some(PathBuf::from("/trips/japan.trip")));
        assert_eq!(config.max_recent_trips, 50);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("config.toml"), "max_recent_trips = \"many\"").expect("write");
        assert!(matches!(Config::load(dir.path()), Err(ConfigError::Parse { .. })));
    }
}
