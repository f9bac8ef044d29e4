//! Graph storage primitives.
//!
//! Key codec, version stamps, record layouts and the node/edge entities,
//! together with the key-value store contract they are persisted through.

/// Key-value store contract.
///
/// Traits describing the ordered, versioned transactional store the graph
/// layer reads and writes through.
pub mod kv;

/// In-memory implementation of the store contract.
pub mod mem;

/// Key codec for node and edge trees.
pub mod keys;

mod edge;
mod etag;
mod metrics;
mod node;
mod options;
mod record;

pub use edge::{Edge, EdgeKey};
pub use etag::{Etag, EtagIssuer, ETAG_LEN};

/// Metrics and profiling.
pub use metrics::{default_metrics, CounterMetrics, GraphMetrics, NoopMetrics};

pub use node::Node;

/// Graph configuration options.
pub use options::GraphOptions;

pub use record::EDGE_HEADER_LEN;
