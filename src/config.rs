//! TOML configuration for graph handles.
//!
//! ```toml
//! [traversal]
//! strategy = "dfs"
//! depth_limit = 4
//!
//! [logging]
//! level = "kvgraph=debug"
//! ```

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algorithms::TraversalType;
use crate::storage::GraphOptions;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings loaded from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    pub traversal: TraversalSection,
    pub logging: LoggingSection,
}

/// `[traversal]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraversalSection {
    pub strategy: TraversalType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_limit: Option<u32>,
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `EnvFilter` directive, e.g. `"info"` or `"kvgraph=trace"`.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl GraphConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|source| ConfigError::ParseText { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration to `path` as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.traversal.depth_limit == Some(0) {
            return Err(ConfigError::InvalidDepthLimit);
        }
        Ok(())
    }

    /// Depth limit as carried by [`GraphOptions`].
    pub fn depth_limit(&self) -> Option<NonZeroU32> {
        self.traversal.depth_limit.and_then(NonZeroU32::new)
    }

    /// Builds graph options from these settings, keeping every other option
    /// at its default.
    pub fn into_options(self) -> GraphOptions {
        let depth_limit = self.depth_limit();
        GraphOptions::new()
            .default_traversal(self.traversal.strategy)
            .default_depth_limit(depth_limit)
    }
}

/// Failures while loading or saving a [`GraphConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read graph config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse graph config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse graph config: {source}")]
    ParseText { source: toml::de::Error },
    #[error("failed to serialize graph config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write graph config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("traversal depth_limit must be at least 1")]
    InvalidDepthLimit,
}
