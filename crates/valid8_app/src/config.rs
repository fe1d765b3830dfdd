//! `valid8.ron` loading.
//!
//! Every field is optional in the file; missing ones take the defaults below.
//! `VALID8_API_URL` overrides `api_base_url`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use valid8_core::PollTiming;
use valid8_engine::ApiSettings;
use valid8_logging::valid8_info;

pub const DEFAULT_CONFIG_FILENAME: &str = "valid8.ron";
pub const API_URL_ENV: &str = "VALID8_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub finish_delay_ms: u64,
    /// Zero disables the polling deadline.
    pub max_poll_secs: u64,
    pub request_timeout_secs: u64,
    pub data_dir: PathBuf,
    pub seed_path: Option<PathBuf>,
    pub seed_url: Option<String>,
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 1000,
            finish_delay_ms: 800,
            max_poll_secs: 600,
            request_timeout_secs: 30,
            data_dir: PathBuf::from("./.valid8"),
            seed_path: None,
            seed_url: None,
            log_to_file: false,
        }
    }
}

impl AppConfig {
    /// Loads `explicit` if given, else `./valid8.ron` when present, else defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        valid8_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    fn apply_env_override(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url;
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ApiSettings::default()
        }
    }

    pub fn poll_timing(&self) -> PollTiming {
        PollTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            finish_delay: Duration::from_millis(self.finish_delay_ms),
            max_poll_duration: (self.max_poll_secs > 0)
                .then(|| Duration::from_secs(self.max_poll_secs)),
        }
    }

    pub fn seed_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::parse(
            r#"(
                api_base_url: "https://valid8.example.com/api",
                poll_interval_ms: 250,
                seed_path: Some("seed-history.json"),
            )"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://valid8.example.com/api");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.finish_delay_ms, 800);
        assert_eq!(config.seed_path, Some(PathBuf::from("seed-history.json")));
        assert_eq!(config.data_dir, PathBuf::from("./.valid8"));
    }

    #[test]
    fn env_override_wins_unless_blank() {
        let mut config = AppConfig::default();
        config.apply_env_override(Some("  ".to_string()));
        assert_eq!(config.api_base_url, "http://localhost:8000");
        config.apply_env_override(Some("http://10.0.0.5:9000".to_string()));
        assert_eq!(config.api_base_url, "http://10.0.0.5:9000");
    }

    #[test]
    fn zero_max_poll_disables_deadline() {
        let config = AppConfig {
            max_poll_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.poll_timing().max_poll_duration, None);
        assert_eq!(
            AppConfig::default().poll_timing(),
            PollTiming::default()
        );
    }

    #[test]
    fn bundled_assets_parse() {
        let example = AppConfig::parse(include_str!("../assets/valid8.example.ron")).unwrap();
        assert_eq!(example.api_base_url, AppConfig::default().api_base_url);
        assert!(example.seed_path.is_some());

        let seed = valid8_engine::parse_seed(include_bytes!("../assets/seed-history.json")).unwrap();
        assert_eq!(seed.len(), 3);
        assert_eq!(seed[0].stats.valid_count(), 37);
    }

    #[test]
    fn file_round_trip_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valid8.ron");
        let pretty = ron::ser::PrettyConfig::new();
        let written = AppConfig {
            log_to_file: true,
            ..AppConfig::default()
        };
        fs::write(&path, ron::ser::to_string_pretty(&written, pretty).unwrap()).unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap(), written);

        fs::write(&path, "(poll_interval_ms: \"soon\")").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            AppConfig::from_file(&dir.path().join("missing.ron")),
            Err(ConfigError::Io { .. })
        ));
    }
}
