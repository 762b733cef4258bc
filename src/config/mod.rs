//! Configuration management module
//!
//! Handles loading, saving, and validation of benchmark configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::io::{DEFAULT_BLOCK_SIZE, DEFAULT_REPEAT_COUNT};
use crate::{Result, StorageMeterError, APP_NAME, CONFIG_FILE};

pub mod persistence;

/// Benchmark configuration structure containing all sweep parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Directory the benchmark files are written into
    pub test_dir: PathBuf,
    /// Initial size of the in-memory block (in bytes)
    pub block_size: usize,
    /// How many times each writer writes the block
    pub repeat_count: u32,
    /// Time budget for the single-threaded calibration trial
    #[serde(with = "humantime_serde")]
    pub max_trial_duration: Duration,
    /// Consecutive slower trials that end the sweep
    pub max_slow_trials: u32,
    /// Optional upper bound on the thread count; unbounded when absent
    pub max_threads: Option<usize>,
    /// Whether to keep the benchmark files after the run
    pub keep_files: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            test_dir: std::env::temp_dir().join(APP_NAME),
            block_size: DEFAULT_BLOCK_SIZE,
            repeat_count: DEFAULT_REPEAT_COUNT,
            max_trial_duration: Duration::from_secs(2),
            max_slow_trials: 2,
            max_threads: None,
            keep_files: false,
        }
    }
}

impl BenchmarkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.test_dir.as_os_str().is_empty() {
            return Err(StorageMeterError::ConfigError(
                "Test directory must not be empty".to_string(),
            ));
        }

        if self.test_dir.exists() && !self.test_dir.is_dir() {
            return Err(StorageMeterError::ConfigError(format!(
                "Test path is not a directory: {}",
                self.test_dir.display()
            )));
        }

        if self.block_size == 0 {
            return Err(StorageMeterError::ConfigError(
                "Block size must be greater than 0".to_string(),
            ));
        }

        if self.repeat_count == 0 {
            return Err(StorageMeterError::ConfigError(
                "Repeat count must be greater than 0".to_string(),
            ));
        }

        if self.max_trial_duration.is_zero() {
            return Err(StorageMeterError::ConfigError(
                "Maximum trial duration must be greater than 0".to_string(),
            ));
        }

        if self.max_slow_trials == 0 {
            return Err(StorageMeterError::ConfigError(
                "Maximum slow trials must be greater than 0".to_string(),
            ));
        }

        if let Some(max_threads) = self.max_threads {
            if max_threads < 2 {
                return Err(StorageMeterError::ConfigError(format!(
                    "Thread limit must be at least 2 (got {})",
                    max_threads
                )));
            }
        }

        Ok(())
    }

    /// Set the directory benchmark files are written into
    pub fn with_test_dir(mut self, path: PathBuf) -> Self {
        self.test_dir = path;
        self
    }

    /// Set the initial block size
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Set how many times each writer writes the block
    pub fn with_repeat_count(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self
    }

    /// Set the calibration time budget
    pub fn with_max_trial_duration(mut self, duration: Duration) -> Self {
        self.max_trial_duration = duration;
        self
    }

    /// Set how many consecutive regressions end the sweep
    pub fn with_max_slow_trials(mut self, count: u32) -> Self {
        self.max_slow_trials = count;
        self
    }

    /// Cap the thread count of the sweep
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set whether to keep benchmark files
    pub fn with_keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }

    /// Bytes each writer puts on disk per trial
    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StorageMeterError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            StorageMeterError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageMeterError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            StorageMeterError::ConfigError(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/storagemeter/storagemeter.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            StorageMeterError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

// Durations are written as "2s", "1500ms" in the TOML file
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
