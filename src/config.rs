//! Service configuration via `sourcemill.toml`
//!
//! A single config file controls where workspaces live and how large an
//! upload may be. On first start a default file is written next to the
//! data; edit and restart to change settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default upload budget per workspace: 500 MB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 500 * 1024 * 1024;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("config I/O error at {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has the wrong shape.
    #[error("invalid config at {path}: {message}")]
    Invalid {
        /// Config file path
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

impl From<ConfigError> for sourcemill_core::Error {
    fn from(e: ConfigError) -> Self {
        sourcemill_core::Error::serialization(e.to_string())
    }
}

/// Service configuration loaded from `sourcemill.toml`.
///
/// # Example
///
/// ```toml
/// # Where workspaces live.
/// base_dir = "/data/uploads"
///
/// # Uncomment to stage writes in a quarantine root until persisted.
/// # quarantine_dir = "/data/quarantine"
///
/// # Per-workspace upload budget in bytes.
/// max_upload_size_bytes = 524288000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcemillConfig {
    /// Base directory holding all workspaces.
    pub base_dir: PathBuf,
    /// Optional quarantine root; selects the quarantine storage backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine_dir: Option<PathBuf>,
    /// Per-workspace upload budget in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

impl Default for SourcemillConfig {
    fn default() -> Self {
        SourcemillConfig {
            base_dir: PathBuf::from("./workspaces"),
            quarantine_dir: None,
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl SourcemillConfig {
    /// Load the config file, writing the defaults first when it does not
    /// exist yet.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            let config = SourcemillConfig::default();
            config.save(path)?;
            return Ok(config);
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the config out as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
