//! Graph model and traversal engine over an ordered, versioned key-value
//! store.
//!
//! Nodes and typed, directed edges are stored as records in two trees whose
//! big-endian keys make every node's outgoing edges one contiguous prefix
//! range. On top of that sit read-only adjacency queries and BFS/DFS
//! traversal, search and shortest-path algorithms that run inside a single
//! transaction.

#![warn(missing_docs)]

pub mod algorithms;
pub mod config;
pub mod graph;
pub mod logging;
pub mod query;
pub mod storage;
pub mod types;

pub use algorithms::{
    AlgorithmState, CancellationToken, DijkstraShortestPath, RunHandle, SearchAlgorithm,
    SingleDestinationShortestPath, TraversalAlgorithm, TraversalNodeInfo, TraversalType,
    VisitDecision, Visitor,
};
pub use graph::Graph;
pub use query::{Adjacent, EdgeTypeFilter, GraphQueries};
pub use storage::{Edge, EdgeKey, Etag, EtagIssuer, GraphOptions, Node};
pub use types::{EdgeType, GraphError, NodeKey, Result};
