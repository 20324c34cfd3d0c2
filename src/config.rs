//! Configuration management for ocr-sync

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::{EngineSettings, RunOptions};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Trigger/capture timing
    #[serde(default)]
    pub sync: SyncConfig,

    /// Transcript export
    #[serde(default)]
    pub export: ExportConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Comma separated OCR shortcut, e.g. "ctrl,alt,z"
    #[serde(default = "default_trigger_keys")]
    pub trigger_keys: String,

    /// Optional chord sent to the player right before timing starts
    #[serde(default)]
    pub begin_keys: Option<String>,

    /// Added to each cue end time (ms); negative fires earlier
    #[serde(default)]
    pub offset_ms: i64,

    /// Countdown before timing starts, to switch to the player
    #[serde(default = "default_prep_seconds")]
    pub prep_seconds: i64,

    /// Time the OCR tool gets to copy its result (ms)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Longest single sleep while waiting for a deadline (ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Clipboard read timeout (ms)
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory for transcripts when no output path is given.
    /// Defaults to the subtitle file's directory.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
}

// Default value functions
fn default_trigger_keys() -> String {
    "ctrl,alt,z".to_string()
}

fn default_prep_seconds() -> i64 {
    5
}

fn default_settle_ms() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    1
}

fn default_capture_timeout() -> u64 {
    2000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            trigger_keys: default_trigger_keys(),
            begin_keys: None,
            offset_ms: 0,
            prep_seconds: default_prep_seconds(),
            settle_ms: default_settle_ms(),
            poll_interval_ms: default_poll_interval(),
            capture_timeout_ms: default_capture_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from `config_path`, writing defaults if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path.to_path_buf());
            Ok(config)
        } else {
            let config = Config {
                config_path: Some(config_path.to_path_buf()),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "ocr-sync", "ocr-sync")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Options for the next run
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            trigger_keys: self.sync.trigger_keys.clone(),
            begin_keys: self.sync.begin_keys.clone(),
            offset_ms: self.sync.offset_ms,
            prep_seconds: self.sync.prep_seconds,
            settle_ms: self.sync.settle_ms,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            poll_interval: Duration::from_millis(self.sync.poll_interval_ms.max(1)),
        }
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.sync.capture_timeout_ms)
    }

    /// Default transcript path for a subtitle file: same stem, `.txt`
    pub fn transcript_path_for(&self, subtitle: &Path) -> PathBuf {
        let stem = subtitle
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transcript".to_string());
        let file_name = format!("{}.txt", stem);

        match &self.export.output_directory {
            Some(dir) => dir.join(file_name),
            None => subtitle.with_file_name(file_name),
        }
    }
}
