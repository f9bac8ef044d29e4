//! Identifier aliases and the crate-wide error type.

use thiserror::Error;

use crate::config::ConfigError;

/// Caller-assigned identity of a node, unique within one graph.
pub type NodeKey = i64;

/// Discriminator of an edge between two nodes.
pub type EdgeType = u16;

/// Errors surfaced by the graph layer and the algorithms built on it.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A required argument was missing or unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// An operation was attempted from a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// A stored record does not match its expected layout.
    #[error("corrupt data: {0}")]
    CorruptData(String),
    /// Cooperative cancellation was observed mid-run.
    #[error("operation cancelled")]
    Cancelled,
    /// A background run did not complete (panicked or was aborted).
    #[error("background task failed: {0}")]
    Background(String),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GraphError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        GraphError::CorruptData(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
