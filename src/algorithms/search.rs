use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::graph::Graph;
use crate::query::EdgeTypeFilter;
use crate::storage::kv::KvRead;
use crate::storage::Node;
use crate::types::{GraphError, NodeKey, Result};

use super::traversal::{load_root, NoopVisitor, Visitor};
use super::{
    AlgorithmState, CancellationToken, Frontier, RunHandle, StateCell, TraversalNodeInfo,
    TraversalType,
};

type PayloadPredicate = Box<dyn Fn(&[u8]) -> bool + Send + Sync>;
type StopPredicate = Box<dyn Fn(&[Node]) -> bool + Send + Sync>;

/// Walks the graph collecting nodes whose payload matches a predicate.
///
/// Unlike [`super::TraversalAlgorithm`], every node is put on the frontier at
/// most once. Results keep the order in which nodes were taken off the
/// frontier. Without a search predicate nothing matches; without a stop
/// predicate the search runs until the frontier is exhausted.
pub struct SearchAlgorithm<T, V = NoopVisitor> {
    tx: Arc<T>,
    graph: Arc<Graph>,
    root: Node,
    traversal: TraversalType,
    cancel: CancellationToken,
    edge_type_filter: EdgeTypeFilter,
    depth_limit: Option<NonZeroU32>,
    search_predicate: Option<PayloadPredicate>,
    stop_predicate: Option<StopPredicate>,
    visitor: Mutex<V>,
    state: StateCell,
}

impl<T: KvRead> SearchAlgorithm<T, NoopVisitor> {
    /// Prepares a search rooted at `root`, which must exist in `tx`.
    pub fn new(
        tx: Arc<T>,
        graph: Arc<Graph>,
        root: impl Into<NodeKey>,
        traversal: TraversalType,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let root = load_root(&*tx, &graph, root.into())?;
        let depth_limit = graph.options().default_depth_limit;
        Ok(Self {
            tx,
            graph,
            root,
            traversal,
            cancel,
            edge_type_filter: EdgeTypeFilter::Any,
            depth_limit,
            search_predicate: None,
            stop_predicate: None,
            visitor: Mutex::new(NoopVisitor),
            state: StateCell::new(),
        })
    }
}

impl<T: KvRead, V: Visitor> SearchAlgorithm<T, V> {
    /// Selects the nodes to collect by their payload.
    pub fn search_predicate(
        mut self,
        predicate: impl Fn(&[u8]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.search_predicate = Some(Box::new(predicate));
        self
    }

    /// Ends the search once `predicate` holds for the results collected so
    /// far. Checked after every frontier item.
    pub fn stop_predicate(
        mut self,
        predicate: impl Fn(&[Node]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.stop_predicate = Some(Box::new(predicate));
        self
    }

    pub fn edge_type_filter(mut self, filter: impl Into<EdgeTypeFilter>) -> Self {
        self.edge_type_filter = filter.into();
        self
    }

    /// Stops expansion at items of depth `limit`; the root has depth 1.
    pub fn depth_limit(mut self, limit: u32) -> Result<Self> {
        let limit = NonZeroU32::new(limit)
            .ok_or(GraphError::InvalidArgument("depth limit must be at least 1"))?;
        self.depth_limit = Some(limit);
        Ok(self)
    }

    /// Attaches an observer. Its `examine` and `discover_adjacent` calls are
    /// made; its decisions are ignored.
    pub fn with_visitor<W: Visitor>(self, visitor: W) -> SearchAlgorithm<T, W> {
        SearchAlgorithm {
            tx: self.tx,
            graph: self.graph,
            root: self.root,
            traversal: self.traversal,
            cancel: self.cancel,
            edge_type_filter: self.edge_type_filter,
            depth_limit: self.depth_limit,
            search_predicate: self.search_predicate,
            stop_predicate: self.stop_predicate,
            visitor: Mutex::new(visitor),
            state: self.state,
        }
    }

    pub fn state(&self) -> AlgorithmState {
        self.state.get()
    }

    pub fn into_visitor(self) -> V {
        self.visitor.into_inner()
    }

    /// Runs the search on the calling thread and returns every match.
    ///
    /// Matches gathered before an error are dropped with it.
    pub fn run(&self) -> Result<Vec<Node>> {
        self.state.begin()?;
        debug!(root = self.root.key, strategy = %self.traversal, "search started");
        let metrics = Arc::clone(self.graph.queries().metrics());
        match self.search() {
            Ok((state, results)) => {
                let state = self.state.complete(state);
                metrics.run_completed(state.outcome());
                debug!(
                    root = self.root.key,
                    ?state,
                    matches = results.len(),
                    "search completed"
                );
                Ok(results)
            }
            Err(err) => {
                if matches!(err, GraphError::Cancelled) {
                    metrics.run_completed("cancelled");
                }
                debug!(root = self.root.key, error = %err, "search failed");
                Err(err)
            }
        }
    }

    fn search(&self) -> Result<(AlgorithmState, Vec<Node>)> {
        let queries = self.graph.queries();
        let tx = &*self.tx;
        let mut visitor = self.visitor.lock();
        let mut results = Vec::new();
        let mut visited: FxHashSet<NodeKey> = FxHashSet::default();
        let mut frontier = Frontier::new(self.traversal);
        visited.insert(self.root.key);
        frontier.put(TraversalNodeInfo::root(self.root.clone()));

        while !frontier.is_empty() {
            self.cancel.check()?;
            let Some(info) = frontier.next() else {
                break;
            };
            queries.metrics().frontier_item();
            trace!(
                node = info.current_node.key,
                depth = info.traversal_depth,
                "examining search candidate"
            );
            let _ = visitor.examine(&info);

            if self
                .search_predicate
                .as_ref()
                .is_some_and(|matches| matches(&info.current_node.payload[..]))
            {
                results.push(info.current_node.clone());
            }
            if self
                .stop_predicate
                .as_ref()
                .is_some_and(|stop| stop(results.as_slice()))
            {
                return Ok((AlgorithmState::Aborted, results));
            }
            if self
                .depth_limit
                .is_some_and(|limit| info.traversal_depth >= limit.get())
            {
                continue;
            }

            for adjacent in queries.adjacent_of(tx, info.current_node.key, self.edge_type_filter)? {
                let adjacent = adjacent?;
                if visited.contains(&adjacent.node.key) {
                    continue;
                }
                self.cancel.check()?;
                visited.insert(adjacent.node.key);
                visitor.discover_adjacent(&adjacent);
                frontier.put(info.child(adjacent.node, adjacent.edge.weight));
            }
        }
        Ok((AlgorithmState::Finished, results))
    }
}

impl<T, V> SearchAlgorithm<T, V>
where
    T: KvRead + Send + Sync + 'static,
    V: Visitor + Send + 'static,
{
    /// Runs the search on the Tokio blocking pool.
    pub fn run_async(self: &Arc<Self>) -> Result<RunHandle<Vec<Node>>> {
        let this = Arc::clone(self);
        RunHandle::spawn(move || this.run())
    }
}

impl<T, V> fmt::Debug for SearchAlgorithm<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchAlgorithm")
            .field("root", &self.root.key)
            .field("traversal", &self.traversal)
            .field("edge_type_filter", &self.edge_type_filter)
            .field("depth_limit", &self.depth_limit)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}
