use std::num::NonZeroU32;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::graph::Graph;
use crate::query::{Adjacent, EdgeTypeFilter};
use crate::storage::kv::KvRead;
use crate::storage::{EdgeKey, Node};
use crate::types::{GraphError, NodeKey, Result};

use super::{
    AlgorithmState, CancellationToken, Frontier, RunHandle, StateCell, TraversalNodeInfo,
    TraversalType,
};

/// Answer of [`Visitor::examine`] for a popped frontier item.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum VisitDecision {
    #[default]
    Continue,
    /// Keep walking but do not expand this item.
    SkipChildren,
    /// End the run; it finishes as [`AlgorithmState::Aborted`].
    Stop,
}

/// Extension point observing and steering a traversal.
///
/// All methods have no-op defaults so implementations override only what
/// they need.
pub trait Visitor {
    /// Called for every item taken off the frontier.
    fn examine(&mut self, info: &TraversalNodeInfo) -> VisitDecision {
        let _ = info;
        VisitDecision::Continue
    }

    /// Returning `true` keeps `adjacent` off the frontier. The edge still
    /// counts as traversed.
    fn skip_adjacent(&mut self, adjacent: &Adjacent) -> bool {
        let _ = adjacent;
        false
    }

    /// Called for every adjacent node about to be put on the frontier.
    fn discover_adjacent(&mut self, adjacent: &Adjacent) {
        let _ = adjacent;
    }
}

/// Visitor that never interferes.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopVisitor;

impl Visitor for NoopVisitor {}

impl<V: Visitor + ?Sized> Visitor for &mut V {
    fn examine(&mut self, info: &TraversalNodeInfo) -> VisitDecision {
        (**self).examine(info)
    }

    fn skip_adjacent(&mut self, adjacent: &Adjacent) -> bool {
        (**self).skip_adjacent(adjacent)
    }

    fn discover_adjacent(&mut self, adjacent: &Adjacent) {
        (**self).discover_adjacent(adjacent)
    }
}

/// Breadth- or depth-first walk from a root node.
///
/// An instance runs at most once. Every edge is expanded at most once per
/// run, but a node reachable over several edges may be visited repeatedly.
/// All observable output goes through the [`Visitor`].
pub struct TraversalAlgorithm<T, V = NoopVisitor> {
    tx: Arc<T>,
    graph: Arc<Graph>,
    root: Node,
    traversal: TraversalType,
    cancel: CancellationToken,
    edge_type_filter: EdgeTypeFilter,
    depth_limit: Option<NonZeroU32>,
    visitor: Mutex<V>,
    state: StateCell,
}

impl<T: KvRead> TraversalAlgorithm<T, NoopVisitor> {
    /// Prepares a traversal rooted at `root`, which must exist in `tx`.
    ///
    /// The depth limit starts from the graph's configured default.
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
            visitor: Mutex::new(NoopVisitor),
            state: StateCell::new(),
        })
    }

    /// Like [`TraversalAlgorithm::new`], using the graph's default strategy.
    pub fn with_default_strategy(
        tx: Arc<T>,
        graph: Arc<Graph>,
        root: impl Into<NodeKey>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let traversal = graph.options().default_traversal;
        Self::new(tx, graph, root, traversal, cancel)
    }
}

impl<T: KvRead, V: Visitor> TraversalAlgorithm<T, V> {
    /// Restricts expansion to edges accepted by `filter`.
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

    /// Replaces the visitor.
    pub fn with_visitor<W: Visitor>(self, visitor: W) -> TraversalAlgorithm<T, W> {
        TraversalAlgorithm {
            tx: self.tx,
            graph: self.graph,
            root: self.root,
            traversal: self.traversal,
            cancel: self.cancel,
            edge_type_filter: self.edge_type_filter,
            depth_limit: self.depth_limit,
            visitor: Mutex::new(visitor),
            state: self.state,
        }
    }

    pub fn state(&self) -> AlgorithmState {
        self.state.get()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Locks the visitor. Blocks while a run is in progress.
    pub fn visitor(&self) -> MutexGuard<'_, V> {
        self.visitor.lock()
    }

    pub fn into_visitor(self) -> V {
        self.visitor.into_inner()
    }

    /// Runs the traversal to completion on the calling thread.
    ///
    /// Returns the terminal state. On error, including cancellation, the
    /// state is left at [`AlgorithmState::Running`].
    pub fn run(&self) -> Result<AlgorithmState> {
        self.state.begin()?;
        debug!(
            root = self.root.key,
            strategy = %self.traversal,
            depth_limit = ?self.depth_limit,
            "traversal started"
        );
        let metrics = Arc::clone(self.graph.queries().metrics());
        match self.traverse() {
            Ok(state) => {
                let state = self.state.complete(state);
                metrics.run_completed(state.outcome());
                debug!(root = self.root.key, ?state, "traversal completed");
                Ok(state)
            }
            Err(err) => {
                if matches!(err, GraphError::Cancelled) {
                    metrics.run_completed("cancelled");
                }
                debug!(root = self.root.key, error = %err, "traversal failed");
                Err(err)
            }
        }
    }

    fn traverse(&self) -> Result<AlgorithmState> {
        let queries = self.graph.queries();
        let tx = &*self.tx;
        let mut visitor = self.visitor.lock();
        let mut traversed: FxHashSet<EdgeKey> = FxHashSet::default();
        let mut frontier = Frontier::new(self.traversal);
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
                pending = frontier.len(),
                "examining frontier item"
            );

            match visitor.examine(&info) {
                VisitDecision::Stop => return Ok(AlgorithmState::Aborted),
                VisitDecision::SkipChildren => continue,
                VisitDecision::Continue => {}
            }
            if self
                .depth_limit
                .is_some_and(|limit| info.traversal_depth >= limit.get())
            {
                continue;
            }

            for adjacent in queries.adjacent_of(tx, info.current_node.key, self.edge_type_filter)? {
                let adjacent = adjacent?;
                if traversed.contains(&adjacent.edge.key) {
                    continue;
                }
                self.cancel.check()?;
                traversed.insert(adjacent.edge.key);
                if visitor.skip_adjacent(&adjacent) {
                    continue;
                }
                visitor.discover_adjacent(&adjacent);
                frontier.put(info.child(adjacent.node, adjacent.edge.weight));
            }
        }
        Ok(AlgorithmState::Finished)
    }
}

impl<T, V> TraversalAlgorithm<T, V>
where
    T: KvRead + Send + Sync + 'static,
    V: Visitor + Send + 'static,
{
    /// Runs the traversal on the Tokio blocking pool.
    ///
    /// The returned handle resolves to the same outcome as [`Self::run`].
    pub fn run_async(self: &Arc<Self>) -> Result<RunHandle<AlgorithmState>> {
        let this = Arc::clone(self);
        RunHandle::spawn(move || this.run())
    }
}

pub(crate) fn load_root<T: KvRead>(tx: &T, graph: &Graph, key: NodeKey) -> Result<Node> {
    graph
        .queries()
        .load_node(tx, key)?
        .ok_or(GraphError::InvalidArgument("root node does not exist"))
}
