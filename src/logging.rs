//! Logging setup for applications embedding the graph.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::GraphConfig;
use crate::types::{GraphError, Result};

/// Installs a global `fmt` subscriber filtered by `level`.
///
/// `level` takes `EnvFilter` syntax. Fails if the directive does not parse or
/// a global subscriber is already installed.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|_| GraphError::InvalidArgument("invalid log filter directive"))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| GraphError::InvalidArgument("logging already initialized"))
}

/// [`init_logging`] with the level from a loaded configuration.
pub fn init_from_config(config: &GraphConfig) -> Result<()> {
    init_logging(&config.logging.level)
}
