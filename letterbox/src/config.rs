//! Application configuration
//!
//! Crate-wide constants plus the on-disk `AppConfig` document that lives in
//! the data directory next to the database.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ===== Scheduling =====

/// Gap between consecutive overdue reminders replayed by rehydration.
/// Overdue alarms fire immediately, so replaying them all at once would
/// deliver a burst on every reboot.
pub const OVERDUE_STAGGER_MINUTES: i64 = 1;

// ===== Validation Limits =====

/// Maximum length for caller-supplied identifiers.
/// Blob paths are derived from document ids.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length for a category label after trimming
pub const MAX_CATEGORY_LABEL_LENGTH: usize = 64;

// ===== Files =====

/// Config file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "letterbox.json";

/// Environment variable that overrides the default data directory
pub const DATA_DIR_ENV: &str = "LETTERBOX_DATA_DIR";

/// Data directory used when neither an argument nor the env var is given
pub const DEFAULT_DATA_DIR: &str = "letterbox-data";

fn default_log_filter() -> String {
    "letterbox=debug,info".to_string()
}

fn default_database_file() -> String {
    "letterbox.sqlite".to_string()
}

fn default_blobs_dir() -> String {
    "pages".to_string()
}

fn default_true() -> bool {
    true
}

/// Runtime configuration persisted as JSON in the data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// SQLite file name, relative to the data directory
    #[serde(default = "default_database_file")]
    pub database_file: String,
    /// Page image directory, relative to the data directory
    #[serde(default = "default_blobs_dir")]
    pub blobs_dir: String,
    /// Replay pending reminders into the wake-up scheduler at startup
    #[serde(default = "default_true")]
    pub rehydrate_on_start: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            database_file: default_database_file(),
            blobs_dir: default_blobs_dir(),
            rehydrate_on_start: true,
        }
    }
}

impl AppConfig {
    /// Load the config from `data_dir`, writing defaults if the file is missing
    pub async fn load(data_dir: &Path) -> Result<Self> {
        if let Some(config) = Self::read(data_dir).await? {
            return Ok(config);
        }

        tracing::info!(
            "Config file not found, writing defaults to {:?}",
            data_dir.join(CONFIG_FILE_NAME)
        );
        let default = Self::default();
        default.save(data_dir).await?;
        Ok(default)
    }

    /// Read the config from `data_dir` without writing or logging anything.
    /// Returns `None` if there is no config file yet.
    pub async fn read(data_dir: &Path) -> Result<Option<Self>> {
        let path = data_dir.join(CONFIG_FILE_NAME);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse config: {}", e)))?;

        Ok(Some(config))
    }

    /// Write the config to `data_dir`
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir).await?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(data_dir.join(CONFIG_FILE_NAME), content).await?;
        Ok(())
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }

    pub fn blobs_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.blobs_dir)
    }
}

/// Resolve the data directory: explicit argument, then env var, then default
pub fn resolve_data_dir(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var(DATA_DIR_ENV).ok())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
