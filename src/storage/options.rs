use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::algorithms::TraversalType;

use super::etag::EtagIssuer;
use super::metrics::{default_metrics, GraphMetrics};

/// Configuration options supplied when creating a [`crate::graph::Graph`].
#[derive(Clone)]
pub struct GraphOptions {
    /// Metrics sink notified of reads and algorithm runs.
    pub metrics: Arc<dyn GraphMetrics>,
    /// Issuer stamping records written through the graph; `None` uses the
    /// process-wide issuer.
    pub etag_issuer: Option<Arc<EtagIssuer>>,
    /// Strategy used by algorithms built without an explicit one.
    pub default_traversal: TraversalType,
    /// Depth limit applied by algorithms built without an explicit one.
    pub default_depth_limit: Option<NonZeroU32>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
            etag_issuer: None,
            default_traversal: TraversalType::Bfs,
            default_depth_limit: None,
        }
    }
}

impl GraphOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn GraphMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Uses a dedicated etag issuer instead of the process-wide one.
    pub fn etag_issuer(mut self, issuer: Arc<EtagIssuer>) -> Self {
        self.etag_issuer = Some(issuer);
        self
    }

    /// Sets the default traversal strategy.
    pub fn default_traversal(mut self, traversal: TraversalType) -> Self {
        self.default_traversal = traversal;
        self
    }

    /// Sets the default depth limit.
    pub fn default_depth_limit(mut self, limit: Option<NonZeroU32>) -> Self {
        self.default_depth_limit = limit;
        self
    }
}

impl fmt::Debug for GraphOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphOptions")
            .field("etag_issuer", &self.etag_issuer)
            .field("default_traversal", &self.default_traversal)
            .field("default_depth_limit", &self.default_depth_limit)
            .finish_non_exhaustive()
    }
}
