#![forbid(unsafe_code)]

//! Graph algorithms run inside a single transaction.
//!
//! Shared building blocks live here: the run state machine, cooperative
//! cancellation, the BFS/DFS frontier and the handle returned by
//! asynchronous runs.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::storage::Node;
use crate::types::{GraphError, Result};

/// Breadth- or depth-first walk.
pub mod traversal;

/// Predicate-driven node search.
pub mod search;

/// Single-destination shortest path.
pub mod shortest_path;

pub use search::SearchAlgorithm;
pub use shortest_path::{DijkstraShortestPath, SingleDestinationShortestPath};
pub use traversal::{NoopVisitor, TraversalAlgorithm, VisitDecision, Visitor};

/// Order in which discovered nodes are processed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalType {
    /// First discovered, first processed.
    #[default]
    Bfs,
    /// Most recently discovered, first processed.
    Dfs,
}

impl fmt::Display for TraversalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TraversalType::Bfs => "bfs",
            TraversalType::Dfs => "dfs",
        })
    }
}

/// Lifecycle of an algorithm instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum AlgorithmState {
    Created = 0,
    Running = 1,
    /// Stopped early by a visitor or stop predicate.
    Aborted = 2,
    /// Frontier exhausted.
    Finished = 3,
}

impl AlgorithmState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => AlgorithmState::Created,
            1 => AlgorithmState::Running,
            2 => AlgorithmState::Aborted,
            _ => AlgorithmState::Finished,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, AlgorithmState::Aborted | AlgorithmState::Finished)
    }

    pub(crate) fn outcome(self) -> &'static str {
        match self {
            AlgorithmState::Aborted => "aborted",
            _ => "finished",
        }
    }
}

/// Atomic holder for an [`AlgorithmState`], readable while a run is active.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(AlgorithmState::Created as u8))
    }

    pub(crate) fn get(&self) -> AlgorithmState {
        AlgorithmState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `Created` to `Running`; any other starting state is rejected.
    pub(crate) fn begin(&self) -> Result<()> {
        match self.0.compare_exchange(
            AlgorithmState::Created as u8,
            AlgorithmState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(raw) if AlgorithmState::from_u8(raw) == AlgorithmState::Running => {
                Err(GraphError::InvalidState("algorithm is already running"))
            }
            Err(_) => Err(GraphError::InvalidState("algorithm has already completed")),
        }
    }

    pub(crate) fn complete(&self, state: AlgorithmState) -> AlgorithmState {
        debug_assert!(state.is_terminal());
        self.0.store(state as u8, Ordering::Release);
        state
    }
}

/// Cooperative cancellation signal shared between a caller and a run.
///
/// Clones observe the same flag. The default token is never cancelled unless
/// [`CancellationToken::cancel`] is called on it or one of its clones.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fails with [`GraphError::Cancelled`] once the token has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(GraphError::Cancelled);
        }
        Ok(())
    }
}

impl From<Arc<AtomicBool>> for CancellationToken {
    fn from(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

/// One frontier item: a node together with how it was reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalNodeInfo {
    pub current_node: Node,
    /// `None` for the root.
    pub parent_node: Option<Node>,
    /// Weight of the edge that reached `current_node`; zero at the root.
    pub last_edge_weight: i64,
    pub total_edge_weight_up_to_now: i64,
    /// Starts at 1 for the root.
    pub traversal_depth: u32,
}

impl TraversalNodeInfo {
    pub(crate) fn root(node: Node) -> Self {
        Self {
            current_node: node,
            parent_node: None,
            last_edge_weight: 0,
            total_edge_weight_up_to_now: 0,
            traversal_depth: 1,
        }
    }

    pub(crate) fn child(&self, node: Node, weight: i64) -> Self {
        Self {
            current_node: node,
            parent_node: Some(self.current_node.clone()),
            last_edge_weight: weight,
            total_edge_weight_up_to_now: self.total_edge_weight_up_to_now.saturating_add(weight),
            traversal_depth: self.traversal_depth.saturating_add(1),
        }
    }
}

/// Pending items of a run: a FIFO queue for BFS or a LIFO stack for DFS.
#[derive(Debug)]
pub(crate) enum Frontier<I> {
    Queue(VecDeque<I>),
    Stack(Vec<I>),
}

impl<I> Frontier<I> {
    pub(crate) fn new(traversal: TraversalType) -> Self {
        match traversal {
            TraversalType::Bfs => Frontier::Queue(VecDeque::new()),
            TraversalType::Dfs => Frontier::Stack(Vec::new()),
        }
    }

    pub(crate) fn put(&mut self, item: I) {
        match self {
            Frontier::Queue(queue) => queue.push_back(item),
            Frontier::Stack(stack) => stack.push(item),
        }
    }

    pub(crate) fn next(&mut self) -> Option<I> {
        match self {
            Frontier::Queue(queue) => queue.pop_front(),
            Frontier::Stack(stack) => stack.pop(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Frontier::Queue(queue) => queue.len(),
            Frontier::Stack(stack) => stack.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Future resolving to the outcome of a run started on the blocking pool.
///
/// Dropping the handle does not stop the run; cancel it through its
/// [`CancellationToken`].
#[derive(Debug)]
pub struct RunHandle<R> {
    inner: JoinHandle<Result<R>>,
}

impl<R: Send + 'static> RunHandle<R> {
    /// Runs `job` on the current Tokio runtime's blocking pool.
    ///
    /// Fails with [`GraphError::InvalidState`] outside a Tokio runtime.
    pub(crate) fn spawn<F>(job: F) -> Result<Self>
    where
        F: FnOnce() -> Result<R> + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|_| GraphError::InvalidState("asynchronous run requires a Tokio runtime"))?;
        Ok(Self {
            inner: runtime.spawn_blocking(job),
        })
    }
}

impl<R> Future for RunHandle<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(err)) => Poll::Ready(Err(GraphError::Background(err.to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}
