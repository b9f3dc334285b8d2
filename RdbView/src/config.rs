//! Extraction settings for RdbView
//!
//! Settings are read from a TOML file and never written back:
//!
//! ```toml
//! [extract]
//! capacity = 1
//! priority = "background"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rdbarchive::extract::{DEFAULT_CAPACITY, DispatcherConfig, ExecutionPriority};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Batch extraction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Concurrent extractions per batch. Raise only for archives that
    /// tolerate concurrent reads.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Scheduling hint for extraction workers
    #[serde(default)]
    pub priority: ExecutionPriority,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            priority: ExecutionPriority::default(),
        }
    }
}

impl ExtractConfig {
    /// Apply command-line overrides on top of file values.
    #[must_use]
    pub fn with_overrides(
        mut self,
        capacity: Option<usize>,
        priority: Option<ExecutionPriority>,
    ) -> Self {
        if let Some(capacity) = capacity {
            self.capacity = capacity;
        }
        if let Some(priority) = priority {
            self.priority = priority;
        }
        self
    }

    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::with_capacity(self.capacity)
    }
}

/// Top-level config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl AppConfig {
    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("RdbView").join("config.toml"))
    }

    /// Load from `explicit` if given, otherwise from the default location
    /// if a file exists there, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if config.extract.capacity == 0 {
            return Err("extract.capacity must be at least 1".to_string());
        }
        Ok(config)
    }
}
