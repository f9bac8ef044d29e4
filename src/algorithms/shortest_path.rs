use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::graph::Graph;
use crate::query::EdgeTypeFilter;
use crate::storage::kv::KvRead;
use crate::storage::Node;
use crate::types::{GraphError, NodeKey, Result};

use super::traversal::load_root;
use super::{CancellationToken, RunHandle};

/// Shortest path from a fixed source to one destination at a time.
pub trait SingleDestinationShortestPath {
    /// Node keys from the source to `target`, both included, or `None` when
    /// `target` is unreachable.
    fn execute(&self, target: NodeKey) -> Result<Option<Vec<NodeKey>>>;

    /// Runs [`Self::execute`] on the Tokio blocking pool.
    fn execute_async(self: &Arc<Self>, target: NodeKey) -> Result<RunHandle<Option<Vec<NodeKey>>>>
    where
        Self: Sized + Send + Sync + 'static,
    {
        let this = Arc::clone(self);
        RunHandle::spawn(move || this.execute(target))
    }
}

/// Dijkstra's algorithm over edge weights.
///
/// Weights must be non-negative; a negative weight reached during a run
/// fails it with [`GraphError::InvalidArgument`]. Parallel edges are
/// resolved to the cheapest one. Unlike the traversal algorithms this one
/// carries no run state and can be executed repeatedly.
pub struct DijkstraShortestPath<T> {
    tx: Arc<T>,
    graph: Arc<Graph>,
    source: Node,
    cancel: CancellationToken,
    edge_type_filter: EdgeTypeFilter,
}

impl<T: KvRead> DijkstraShortestPath<T> {
    pub fn new(
        tx: Arc<T>,
        graph: Arc<Graph>,
        source: impl Into<NodeKey>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let source = load_root(&*tx, &graph, source.into())?;
        Ok(Self {
            tx,
            graph,
            source,
            cancel,
            edge_type_filter: EdgeTypeFilter::Any,
        })
    }

    pub fn edge_type_filter(mut self, filter: impl Into<EdgeTypeFilter>) -> Self {
        self.edge_type_filter = filter.into();
        self
    }

    pub fn source(&self) -> &Node {
        &self.source
    }

    fn search(&self, target: NodeKey) -> Result<Option<Vec<NodeKey>>> {
        let queries = self.graph.queries();
        let tx = &*self.tx;
        let mut distances: FxHashMap<NodeKey, i64> = FxHashMap::default();
        let mut parents: FxHashMap<NodeKey, NodeKey> = FxHashMap::default();
        let mut heap = BinaryHeap::new();
        distances.insert(self.source.key, 0);
        heap.push(Reverse((0i64, self.source.key)));

        loop {
            self.cancel.check()?;
            let Some(Reverse((distance, key))) = heap.pop() else {
                return Ok(None);
            };
            if distances.get(&key).is_some_and(|best| distance > *best) {
                continue;
            }
            queries.metrics().frontier_item();
            if key == target {
                return Ok(Some(unwind(&parents, self.source.key, target)));
            }

            for edge in queries.edges_from(tx, key, self.edge_type_filter)? {
                let edge = edge?;
                self.cancel.check()?;
                if edge.weight < 0 {
                    return Err(GraphError::InvalidArgument("negative edge weight"));
                }
                let next = edge.key.to;
                let candidate = distance.saturating_add(edge.weight);
                if distances.get(&next).is_some_and(|best| candidate >= *best) {
                    continue;
                }
                if !queries.contains_node(tx, next)? {
                    warn!(edge = %edge.key, "edge points at a missing node, skipping");
                    continue;
                }
                distances.insert(next, candidate);
                parents.insert(next, key);
                heap.push(Reverse((candidate, next)));
            }
        }
    }
}

impl<T: KvRead> SingleDestinationShortestPath for DijkstraShortestPath<T> {
    fn execute(&self, target: NodeKey) -> Result<Option<Vec<NodeKey>>> {
        debug!(source = self.source.key, target, "shortest path started");
        let metrics = Arc::clone(self.graph.queries().metrics());
        let outcome = self.search(target);
        match &outcome {
            Ok(path) => {
                metrics.run_completed("finished");
                debug!(
                    source = self.source.key,
                    target,
                    hops = path.as_ref().map(|p| p.len().saturating_sub(1)),
                    "shortest path completed"
                );
            }
            Err(GraphError::Cancelled) => metrics.run_completed("cancelled"),
            Err(_) => {}
        }
        outcome
    }
}

fn unwind(parents: &FxHashMap<NodeKey, NodeKey>, source: NodeKey, target: NodeKey) -> Vec<NodeKey> {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        match parents.get(&current) {
            Some(parent) => {
                current = *parent;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}
