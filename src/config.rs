//! Configuration types for the capstore binary.
//!
//! Settings are loaded from a `capstore.toml` file:
//!
//! - [`Config`] - Root configuration struct
//! - [`StorageConfig`] - Where entries live and which index backs them
//! - [`RetentionConfig`] - Time-to-live and sweep cadence
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// capstore.toml configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Which metadata index backs the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Persistent redb database under the base directory
    #[default]
    Redb,
    /// Non-persistent; every entry is forgotten when the process exits
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Base directory; defaults to `<cache dir>/capstore`
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub index: IndexKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Entries older than this are removed by the sweeper
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// How often the daemon sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RetentionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_ttl_secs() -> u64 {
    constants::DEFAULT_TTL_SECS
}

fn default_sweep_interval_secs() -> u64 {
    constants::DEFAULT_SWEEP_INTERVAL_SECS
}

impl Config {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - A field has an invalid type or an unknown name
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from `path`, or return defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if `retention.ttl_secs` or
    /// `retention.sweep_interval_secs` is 0, or if `retention.ttl_secs`
    /// exceeds 100 years.
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let retention = &self.retention;
        if retention.ttl_secs == 0 {
            errors.push(
                "retention.ttl_secs cannot be 0. Set a positive number of seconds (default: 86400)"
                    .to_string(),
            );
        }

        if retention.ttl_secs > constants::MAX_TTL_SECS {
            errors.push(format!(
                "retention.ttl_secs ({}) exceeds the maximum of {} (100 years)",
                retention.ttl_secs,
                constants::MAX_TTL_SECS
            ));
        }

        if retention.sweep_interval_secs == 0 {
            errors.push(
                "retention.sweep_interval_secs cannot be 0. Set a positive number of seconds (default: 3600)"
                    .to_string(),
            );
        }

        if retention.ttl_secs > 0 && retention.sweep_interval_secs > retention.ttl_secs {
            warnings.push(format!(
                "retention.sweep_interval_secs ({}) exceeds retention.ttl_secs ({})\n  \
                 Entries may outlive their TTL by up to one sweep interval",
                retention.sweep_interval_secs, retention.ttl_secs
            ));
        }

        if let Some(base_dir) = &self.storage.base_dir
            && base_dir.exists()
            && !base_dir.is_dir()
        {
            errors.push(format!(
                "storage.base_dir is not a directory: {}",
                base_dir.display()
            ));
        }

        if self.storage.index == IndexKind::Memory {
            warnings.push(
                "storage.index = \"memory\": entries are lost when the process exits".to_string(),
            );
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}
