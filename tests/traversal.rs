#![allow(clippy::uninlined_format_args)]

use std::num::NonZeroU32;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use kvgraph::storage::mem::{MemStore, ReadTx};
use kvgraph::storage::CounterMetrics;
use kvgraph::{
    Adjacent, AlgorithmState, CancellationToken, EdgeKey, Graph, GraphError, GraphOptions,
    NodeKey, Result, TraversalAlgorithm, TraversalNodeInfo, TraversalType, VisitDecision,
    Visitor,
};

fn build(graph: &Graph, nodes: &[NodeKey], edges: &[(NodeKey, NodeKey, u16, i64)]) -> Result<MemStore> {
    let store = MemStore::new();
    let mut tx = store.begin_write();
    for &key in nodes {
        graph.put_node(&mut tx, key, Bytes::new())?;
    }
    for &(from, to, ty, weight) in edges {
        graph.put_edge(&mut tx, EdgeKey::new(from, to, ty), weight, Bytes::new())?;
    }
    tx.commit()?;
    Ok(store)
}

fn read(store: &MemStore) -> Arc<ReadTx> {
    Arc::new(store.begin_read())
}

#[derive(Default)]
struct Recorder {
    examined: Vec<NodeKey>,
    depths: Vec<u32>,
    discovered: Vec<NodeKey>,
}

impl Visitor for Recorder {
    fn examine(&mut self, info: &TraversalNodeInfo) -> VisitDecision {
        self.examined.push(info.current_node.key);
        self.depths.push(info.traversal_depth);
        VisitDecision::Continue
    }

    fn discover_adjacent(&mut self, adjacent: &Adjacent) {
        self.discovered.push(adjacent.node.key);
    }
}

/// root(1) -> A(2) -> B(4), root -> C(3), C -> D(5)
fn tree(graph: &Graph) -> Result<MemStore> {
    build(
        graph,
        &[1, 2, 3, 4, 5],
        &[(1, 2, 0, 1), (1, 3, 0, 1), (2, 4, 0, 1), (3, 5, 0, 1)],
    )
}

fn run_recorded(
    store: &MemStore,
    graph: Arc<Graph>,
    traversal: TraversalType,
) -> Result<Recorder> {
    let algorithm = TraversalAlgorithm::new(read(store), graph, 1, traversal, CancellationToken::new())?
        .with_visitor(Recorder::default());
    assert_eq!(algorithm.run()?, AlgorithmState::Finished);
    Ok(algorithm.into_visitor())
}

#[test]
fn bfs_visits_level_by_level() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let recorder = run_recorded(&store, graph, TraversalType::Bfs)?;
    assert_eq!(recorder.examined, vec![1, 2, 3, 4, 5]);
    assert!(recorder.depths.windows(2).all(|pair| pair[0] <= pair[1]));
    Ok(())
}

#[test]
fn dfs_visits_siblings_in_reverse_enumeration_order() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let recorder = run_recorded(&store, graph, TraversalType::Dfs)?;
    assert_eq!(recorder.discovered[..2], [2, 3]);
    assert_eq!(recorder.examined, vec![1, 3, 5, 2, 4]);
    Ok(())
}

#[test]
fn depth_limit_stops_discovery() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = build(&graph, &[1, 2, 3], &[(1, 2, 0, 1), (2, 3, 0, 1)])?;

    let algorithm = TraversalAlgorithm::new(
        read(&store),
        graph.clone(),
        1,
        TraversalType::Bfs,
        CancellationToken::new(),
    )?
    .depth_limit(1)?
    .with_visitor(Recorder::default());
    algorithm.run()?;
    let recorder = algorithm.into_visitor();
    assert_eq!(recorder.examined, vec![1]);
    assert!(recorder.discovered.is_empty());

    let algorithm = TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Bfs,
        CancellationToken::new(),
    )?
    .depth_limit(2)?
    .with_visitor(Recorder::default());
    algorithm.run()?;
    let recorder = algorithm.into_visitor();
    assert_eq!(recorder.discovered, vec![2]);
    assert!(!recorder.examined.contains(&3));
    Ok(())
}

#[test]
fn configured_defaults_apply() -> Result<()> {
    let options = GraphOptions::new()
        .default_traversal(TraversalType::Dfs)
        .default_depth_limit(NonZeroU32::new(2));
    let graph = Arc::new(Graph::new(options));
    let store = tree(&graph)?;
    let algorithm =
        TraversalAlgorithm::with_default_strategy(read(&store), graph, 1, CancellationToken::new())?
            .with_visitor(Recorder::default());
    algorithm.run()?;
    assert_eq!(algorithm.into_visitor().examined, vec![1, 3, 2]);
    Ok(())
}

#[test]
fn edge_type_filter_limits_expansion() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = build(&graph, &[1, 2, 3], &[(1, 2, 1, 1), (1, 3, 2, 1)])?;
    let algorithm = TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Bfs,
        CancellationToken::new(),
    )?
    .edge_type_filter(2u16)
    .with_visitor(Recorder::default());
    algorithm.run()?;
    assert_eq!(algorithm.into_visitor().examined, vec![1, 3]);
    Ok(())
}

#[test]
fn weights_accumulate_along_the_path() -> Result<()> {
    #[derive(Default)]
    struct Weights(Vec<(NodeKey, i64, i64, Option<NodeKey>)>);

    impl Visitor for Weights {
        fn examine(&mut self, info: &TraversalNodeInfo) -> VisitDecision {
            self.0.push((
                info.current_node.key,
                info.last_edge_weight,
                info.total_edge_weight_up_to_now,
                info.parent_node.as_ref().map(|n| n.key),
            ));
            VisitDecision::Continue
        }
    }

    let graph = Arc::new(Graph::default());
    let store = build(&graph, &[1, 2, 3], &[(1, 2, 0, 4), (2, 3, 0, 6)])?;
    let algorithm = TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Dfs,
        CancellationToken::new(),
    )?
    .with_visitor(Weights::default());
    algorithm.run()?;
    assert_eq!(
        algorithm.into_visitor().0,
        vec![(1, 0, 0, None), (2, 4, 4, Some(1)), (3, 6, 10, Some(2))]
    );
    Ok(())
}

#[test]
fn stop_aborts_the_run() -> Result<()> {
    struct StopAt(NodeKey, Vec<NodeKey>);

    impl Visitor for StopAt {
        fn examine(&mut self, info: &TraversalNodeInfo) -> VisitDecision {
            self.1.push(info.current_node.key);
            if info.current_node.key == self.0 {
                VisitDecision::Stop
            } else {
                VisitDecision::Continue
            }
        }
    }

    let metrics = Arc::new(CounterMetrics::default());
    let graph = Arc::new(Graph::new(GraphOptions::new().metrics(metrics.clone())));
    let store = tree(&graph)?;
    let algorithm = TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Bfs,
        CancellationToken::new(),
    )?
    .with_visitor(StopAt(3, Vec::new()));
    assert_eq!(algorithm.run()?, AlgorithmState::Aborted);
    assert_eq!(algorithm.state(), AlgorithmState::Aborted);
    assert_eq!(metrics.runs_aborted.load(Ordering::Relaxed), 1);
    assert_eq!(algorithm.into_visitor().1, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn skip_decisions_prune_the_walk() -> Result<()> {
    struct Pruner(Vec<NodeKey>);

    impl Visitor for Pruner {
        fn examine(&mut self, info: &TraversalNodeInfo) -> VisitDecision {
            self.0.push(info.current_node.key);
            if info.current_node.key == 2 {
                VisitDecision::SkipChildren
            } else {
                VisitDecision::Continue
            }
        }

        fn skip_adjacent(&mut self, adjacent: &Adjacent) -> bool {
            adjacent.node.key == 5
        }
    }

    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let algorithm = TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Bfs,
        CancellationToken::new(),
    )?
    .with_visitor(Pruner(Vec::new()));
    assert_eq!(algorithm.run()?, AlgorithmState::Finished);
    assert_eq!(algorithm.into_visitor().0, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn nodes_are_revisited_through_distinct_edges() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = build(
        &graph,
        &[1, 2, 3, 4],
        &[(1, 2, 0, 1), (1, 3, 0, 1), (2, 4, 0, 1), (3, 4, 0, 1)],
    )?;
    let recorder = run_recorded(&store, graph, TraversalType::Bfs)?;
    assert_eq!(recorder.examined, vec![1, 2, 3, 4, 4]);
    Ok(())
}

#[test]
fn cancellation_before_run_is_reported() -> Result<()> {
    let metrics = Arc::new(CounterMetrics::default());
    let graph = Arc::new(Graph::new(GraphOptions::new().metrics(metrics.clone())));
    let store = tree(&graph)?;
    let cancel = CancellationToken::new();
    let algorithm = TraversalAlgorithm::new(read(&store), graph, 1, TraversalType::Bfs, cancel.clone())?
        .with_visitor(Recorder::default());
    cancel.cancel();
    assert!(matches!(algorithm.run(), Err(GraphError::Cancelled)));
    assert_eq!(algorithm.state(), AlgorithmState::Running);
    assert_eq!(metrics.runs_cancelled.load(Ordering::Relaxed), 1);
    assert!(algorithm.into_visitor().examined.is_empty());
    Ok(())
}

#[test]
fn cancellation_mid_run_stops_expansion() -> Result<()> {
    struct CancelOn(NodeKey, CancellationToken, Vec<NodeKey>);

    impl Visitor for CancelOn {
        fn examine(&mut self, info: &TraversalNodeInfo) -> VisitDecision {
            self.2.push(info.current_node.key);
            if info.current_node.key == self.0 {
                self.1.cancel();
            }
            VisitDecision::Continue
        }
    }

    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let cancel = CancellationToken::new();
    let algorithm = TraversalAlgorithm::new(read(&store), graph, 1, TraversalType::Bfs, cancel.clone())?
        .with_visitor(CancelOn(2, cancel, Vec::new()));
    assert!(matches!(algorithm.run(), Err(GraphError::Cancelled)));
    assert_eq!(algorithm.into_visitor().2, vec![1, 2]);
    Ok(())
}

#[test]
fn concurrent_run_is_rejected() -> Result<()> {
    struct Gate {
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl Visitor for Gate {
        fn examine(&mut self, _info: &TraversalNodeInfo) -> VisitDecision {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            VisitDecision::Continue
        }
    }

    let graph = Arc::new(Graph::default());
    let store = build(&graph, &[1], &[])?;
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let algorithm = TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Bfs,
        CancellationToken::new(),
    )?
    .with_visitor(Gate {
        entered: entered_tx,
        release: release_rx,
    });

    thread::scope(|scope| {
        let first = scope.spawn(|| algorithm.run());
        entered_rx.recv().unwrap();
        assert_eq!(algorithm.state(), AlgorithmState::Running);
        assert!(matches!(algorithm.run(), Err(GraphError::InvalidState(_))));
        release_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap().unwrap(), AlgorithmState::Finished);
    });
    Ok(())
}

#[test]
fn missing_root_is_an_invalid_argument() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let result = TraversalAlgorithm::new(read(&store), graph, 77, TraversalType::Bfs, CancellationToken::new());
    assert!(matches!(result, Err(GraphError::InvalidArgument(_))));
    Ok(())
}

#[test]
fn async_run_outside_runtime_fails() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let algorithm = Arc::new(TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Bfs,
        CancellationToken::new(),
    )?);
    assert!(matches!(algorithm.run_async(), Err(GraphError::InvalidState(_))));
    assert_eq!(algorithm.state(), AlgorithmState::Created);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn async_run_completes() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let algorithm = Arc::new(
        TraversalAlgorithm::new(
            read(&store),
            graph,
            1,
            TraversalType::Dfs,
            CancellationToken::new(),
        )?
        .with_visitor(Recorder::default()),
    );
    let state = algorithm.run_async()?.await?;
    assert_eq!(state, AlgorithmState::Finished);
    assert_eq!(algorithm.visitor().examined, vec![1, 3, 5, 2, 4]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn async_run_propagates_cancellation() -> Result<()> {
    let graph = Arc::new(Graph::default());
    let store = tree(&graph)?;
    let cancel = CancellationToken::new();
    let algorithm = Arc::new(TraversalAlgorithm::new(
        read(&store),
        graph,
        1,
        TraversalType::Bfs,
        cancel.clone(),
    )?);
    cancel.cancel();
    let outcome = algorithm.run_async()?.await;
    assert!(matches!(outcome, Err(GraphError::Cancelled)));
    Ok(())
}
