use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for observing graph reads and algorithm runs.
///
/// Implementations receive a call for every node load, adjacency scan and
/// processed frontier item, plus one call per finished algorithm run. This
/// information can be used for monitoring and profiling.
pub trait GraphMetrics: Send + Sync {
    /// Records a node point lookup that found a record.
    fn node_loaded(&self);

    /// Records a prefix scan over the edge tree.
    ///
    /// # Parameters
    /// * `kind` - `"edges"`, `"adjacent"`, `"between"` or `"isolation"`.
    fn adjacency_scan(&self, kind: &'static str);

    /// Records one frontier item popped by an algorithm.
    fn frontier_item(&self);

    /// Records the outcome of an algorithm run.
    ///
    /// # Parameters
    /// * `outcome` - `"finished"`, `"aborted"` or `"cancelled"`.
    fn run_completed(&self, outcome: &'static str);
}

/// A no-op implementation of [`GraphMetrics`] that discards all recorded metrics.
#[derive(Default)]
pub struct NoopMetrics;

impl GraphMetrics for NoopMetrics {
    fn node_loaded(&self) {}
    fn adjacency_scan(&self, _kind: &'static str) {}
    fn frontier_item(&self) {}
    fn run_completed(&self, _outcome: &'static str) {}
}

/// A thread-safe counter-based implementation of [`GraphMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Node records loaded.
    pub nodes_loaded: AtomicU64,

    /// Outgoing-edge scans.
    pub edge_scans: AtomicU64,

    /// Adjacent-node scans.
    pub adjacent_scans: AtomicU64,

    /// Between-node scans.
    pub between_scans: AtomicU64,

    /// Isolation probes.
    pub isolation_probes: AtomicU64,

    /// Frontier items processed across all runs.
    pub frontier_items: AtomicU64,

    /// Runs that exhausted their frontier.
    pub runs_finished: AtomicU64,

    /// Runs stopped by a visitor or stop predicate.
    pub runs_aborted: AtomicU64,

    /// Runs interrupted by cancellation.
    pub runs_cancelled: AtomicU64,
}

impl GraphMetrics for CounterMetrics {
    fn node_loaded(&self) {
        self.nodes_loaded.fetch_add(1, Ordering::Relaxed);
    }

    fn adjacency_scan(&self, kind: &'static str) {
        let counter = match kind {
            "edges" => &self.edge_scans,
            "adjacent" => &self.adjacent_scans,
            "between" => &self.between_scans,
            "isolation" => &self.isolation_probes,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn frontier_item(&self) {
        self.frontier_items.fetch_add(1, Ordering::Relaxed);
    }

    fn run_completed(&self, outcome: &'static str) {
        let counter = match outcome {
            "finished" => &self.runs_finished,
            "aborted" => &self.runs_aborted,
            "cancelled" => &self.runs_cancelled,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation wrapped in an [`Arc`].
///
/// The default implementation is [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn GraphMetrics> {
    Arc::new(NoopMetrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_by_kind() {
        let metrics = CounterMetrics::default();
        metrics.adjacency_scan("edges");
        metrics.adjacency_scan("adjacent");
        metrics.adjacency_scan("adjacent");
        metrics.adjacency_scan("unknown");
        metrics.run_completed("aborted");
        assert_eq!(metrics.edge_scans.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.adjacent_scans.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.runs_aborted.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.runs_finished.load(Ordering::Relaxed), 0);
    }
}
