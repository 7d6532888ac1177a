use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const API_URL_ENV: &str = "DIARY_API_URL";
pub const LOG_DIR_ENV: &str = "DIARY_LOG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine config directory")]
    NoConfigDir,
    #[error("failed to read config at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryConfig {
    /// Base URL of the entry store, e.g. "http://localhost:5000"
    pub api_url: String,
    /// Quiet period after the last keystroke before a save is sent.
    pub save_delay_ms: u64,
    /// How long "saved" stays up before the indicator returns to "ready".
    pub saved_reset_ms: u64,
    pub request_timeout_secs: u64,
    /// Extra attempts for a failed save before reporting an error.
    pub save_retries: u32,
    pub log_dir: Option<PathBuf>,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            save_delay_ms: 1000,
            saved_reset_ms: 2000,
            request_timeout_secs: 10,
            save_retries: 0,
            log_dir: None,
        }
    }
}

impl DiaryConfig {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("diary-autosave")
            .join("config.toml"))
    }

    /// Config file (defaults if absent) with environment overrides applied.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(dir) = var(LOG_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    pub fn saved_reset(&self) -> Duration {
        Duration::from_millis(self.saved_reset_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Where log files go; falls back to the platform data dir, then `./logs`.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join("diary-autosave").join("logs"))
                .unwrap_or_else(|| PathBuf::from("./logs"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("diary-autosave-does-not-exist.toml");
        let config = DiaryConfig::load_from(&path).unwrap();
        assert_eq!(config, DiaryConfig::default());
        assert_eq!(config.save_delay(), Duration::from_millis(1000));
        assert_eq!(config.saved_reset(), Duration::from_millis(2000));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = std::env::temp_dir().join(format!(
            "diary-autosave-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "api_url = \"http://diary.lan\"\nsave_retries = 2\n").unwrap();
        let config = DiaryConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.api_url, "http://diary.lan");
        assert_eq!(config.save_retries, 2);
        assert_eq!(config.save_delay_ms, 1000);
    }

    #[test]
    fn env_overrides_file() {
        let mut config = DiaryConfig::default();
        config.apply_env(|key| match key {
            API_URL_ENV => Some("http://10.0.0.2:5000".to_string()),
            LOG_DIR_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_url, "http://10.0.0.2:5000");
        assert_eq!(config.log_dir, None);
    }
}
