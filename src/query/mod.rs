#![forbid(unsafe_code)]

//! Graph query layer.
//!
//! Point lookups, existence checks and prefix scans over the node and edge
//! trees of a transaction. Scans are lazy and borrow the transaction, so a
//! sequence can never be consumed after its cursor has gone away.

mod queries;

/// Lazy edge and adjacency sequences.
pub mod scan;

pub use queries::{GraphQueries, SYSTEM_METADATA_KEY};
pub use scan::{Adjacent, AdjacentNodes, AdjacentScan, EdgeScan, EdgeTypeFilter};
