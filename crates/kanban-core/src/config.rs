use crate::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SCANNER_INTERVAL_ENV: &str = "KANBAN_SCANNER_INTERVAL_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
    #[serde(default)]
    pub reorder: ReorderSettings,
}

/// Reminder scanner cadence and batch limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScannerSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Upper bound for a single claim round-trip to the reminder store.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatcherSettings {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Events buffered per connected session before deliveries start failing.
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> usize {
    100
}

fn default_run_timeout_secs() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_session_buffer() -> usize {
    64
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

impl ScannerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            session_buffer: default_session_buffer(),
        }
    }
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/kanban/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("kanban/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("kanban\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load from the platform config path, falling back to defaults when the
    /// file is missing or unreadable. Environment overrides are applied last.
    pub fn load() -> Self {
        let config = Self::config_path()
            .filter(|path| path.exists())
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default();
        config.with_env_overrides()
    }

    pub fn load_from(path: &Path) -> KanbanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| KanbanError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(secs) = std::env::var(SCANNER_INTERVAL_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            self.scanner.interval_secs = secs;
        }
        self
    }

    pub fn validate(&self) -> KanbanResult<()> {
        if self.scanner.interval_secs == 0 {
            return Err(KanbanError::Config(
                "scanner.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.scanner.batch_size == 0 {
            return Err(KanbanError::Config(
                "scanner.batch_size must be at least 1".to_string(),
            ));
        }
        if self.scanner.run_timeout_secs == 0 {
            return Err(KanbanError::Config(
                "scanner.run_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.dispatcher.queue_capacity == 0 || self.dispatcher.session_buffer == 0 {
            return Err(KanbanError::Config(
                "dispatcher capacities must be at least 1".to_string(),
            ));
        }
        if self.reorder.max_attempts == 0 {
            return Err(KanbanError::Config(
                "reorder.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.scanner.interval(), Duration::from_secs(60));
        assert_eq!(config.scanner.batch_size, 100);
        assert_eq!(config.reorder.max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\ninterval_secs = 15\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.scanner.interval_secs, 15);
        assert_eq!(config.scanner.batch_size, 100);
        assert_eq!(config.dispatcher, DispatcherSettings::default());
    }

    #[test]
    fn test_load_rejects_zero_interval() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\ninterval_secs = 0\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, KanbanError::Config(_)));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner\n").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(KanbanError::Config(_))
        ));
    }
}
