//! Application configuration
//!
//! Central location for scheduling constants and validation boundaries,
//! plus the runtime configuration loaded at startup.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ===== Scheduling =====

/// Reminders due within this many days (inclusive) are "due this week"
pub const DUE_SOON_WINDOW_DAYS: i64 = 7;

/// Dose number assumed when a reminder carries none
pub const DEFAULT_DOSE_NUMBER: i64 = 1;

/// Days per week when converting mixed-unit dose intervals
pub const DAYS_PER_WEEK: u32 = 7;

/// Days per month when converting mixed-unit dose intervals
pub const DAYS_PER_MONTH: u32 = 30;

/// Settings key prefix for the per-user auto-setup marker
pub const AUTO_SETUP_SETTING_PREFIX: &str = "vaccine_auto_setup";

/// Icon used for vaccines and reminders without one
pub const DEFAULT_VACCINE_ICON: &str = "💉";

// ===== Validation Limits =====

/// Maximum length of a baby's name
pub const MAX_BABY_NAME_LENGTH: usize = 255;

/// Maximum length of a general reminder title
pub const MAX_REMINDER_TITLE_LENGTH: usize = 255;

// ===== Runtime =====

/// Environment variable naming the JSON config file
pub const CONFIG_PATH_ENV: &str = "VACCINE_SCHEDULER_CONFIG";

/// Runtime configuration for the scheduler binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Seconds between due-soon digest sweeps; 0 runs a single sweep and exits
    #[serde(default = "default_digest_interval_secs")]
    pub digest_interval_secs: u64,
    #[serde(default = "default_seed_vaccines")]
    pub seed_vaccines: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/vaccine-scheduler.db")
}

fn default_log_filter() -> String {
    "vaccine_scheduler=debug,info".to_string()
}

fn default_digest_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_seed_vaccines() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_filter: default_log_filter(),
            digest_interval_secs: default_digest_interval_secs(),
            seed_vaccines: default_seed_vaccines(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            tracing::info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from the path named by `VACCINE_SCHEDULER_CONFIG`, if set.
    pub async fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path)).await,
            None => {
                tracing::info!("{} not set, using default config", CONFIG_PATH_ENV);
                Ok(Self::default())
            }
        }
    }

    /// Log filter to install: a non-empty `RUST_LOG` value overrides the config.
    pub fn effective_log_filter(&self, rust_log: Option<String>) -> String {
        rust_log
            .filter(|directives| !directives.trim().is_empty())
            .unwrap_or_else(|| self.log_filter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load(&temp.path().join("absent.json"))
            .await
            .unwrap();

        assert_eq!(config.digest_interval_secs, 86_400);
        assert!(config.seed_vaccines);
    }

    #[test]
    fn test_rust_log_overrides_configured_filter() {
        let config = AppConfig {
            log_filter: "vaccine_scheduler=trace".to_string(),
            ..Default::default()
        };

        assert_eq!(config.effective_log_filter(None), "vaccine_scheduler=trace");
        assert_eq!(
            config.effective_log_filter(Some("  ".to_string())),
            "vaccine_scheduler=trace"
        );
        assert_eq!(config.effective_log_filter(Some("warn".to_string())), "warn");
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        tokio::fs::write(&path, r#"{"digest_interval_secs": 0}"#)
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.digest_interval_secs, 0);
        assert_eq!(config.log_filter, "vaccine_scheduler=debug,info");
        assert_eq!(
            config.database_path,
            PathBuf::from("data/vaccine-scheduler.db")
        );
    }
}
