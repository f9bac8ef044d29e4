use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::storage::keys;
use crate::storage::kv::{KvRead, Tree, TreeCursor};
use crate::storage::{default_metrics, EdgeKey, GraphMetrics, Node};
use crate::types::{EdgeType, GraphError, NodeKey, Result};

use super::scan::{AdjacentNodes, AdjacentScan, EdgeScan, EdgeTypeFilter};

/// Key of the system-tree record holding graph-level metadata.
pub const SYSTEM_METADATA_KEY: &[u8] = b"graph-metadata";

impl From<&Node> for NodeKey {
    fn from(node: &Node) -> Self {
        node.key
    }
}

pub(crate) fn load_node_with<T: KvRead + ?Sized>(
    tx: &T,
    key: NodeKey,
    metrics: &dyn GraphMetrics,
) -> Result<Option<Node>> {
    let Some(found) = tx.read(Tree::Nodes, &keys::encode_node_key(key))? else {
        return Ok(None);
    };
    let node = Node::from_record(key, &found.value)?;
    metrics.node_loaded();
    Ok(Some(node))
}

/// Read-only graph queries against a transaction.
///
/// Every method borrows the transaction; sequences returned by the scanning
/// methods cannot outlive that borrow.
#[derive(Clone)]
pub struct GraphQueries {
    metrics: Arc<dyn GraphMetrics>,
}

impl Default for GraphQueries {
    fn default() -> Self {
        Self::new(default_metrics())
    }
}

impl std::fmt::Debug for GraphQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQueries").finish_non_exhaustive()
    }
}

impl GraphQueries {
    pub fn new(metrics: Arc<dyn GraphMetrics>) -> Self {
        Self { metrics }
    }

    pub(crate) fn metrics(&self) -> &Arc<dyn GraphMetrics> {
        &self.metrics
    }

    /// Point lookup of a node; `None` when the key is absent.
    pub fn load_node<T: KvRead>(&self, tx: &T, key: NodeKey) -> Result<Option<Node>> {
        load_node_with(tx, key, self.metrics.as_ref())
    }

    /// Whether a node record exists. Existence is decided by the stored
    /// version alone; the record is not decoded.
    pub fn contains_node<T: KvRead>(&self, tx: &T, key: impl Into<NodeKey>) -> Result<bool> {
        let version = tx.read_version(Tree::Nodes, &keys::encode_node_key(key.into()))?;
        Ok(version > 0)
    }

    /// Whether an edge record exists under `key`.
    pub fn contains_edge<T: KvRead>(&self, tx: &T, key: &EdgeKey) -> Result<bool> {
        Ok(tx.read_version(Tree::Edges, &key.encode())? > 0)
    }

    /// All outgoing edges of `node`, ordered by destination then type.
    pub fn get_edges_of<'tx, T: KvRead>(
        &self,
        tx: &'tx T,
        node: &Node,
    ) -> Result<EdgeScan<'tx, T>> {
        self.edges_from(tx, node.key, EdgeTypeFilter::Any)
    }

    pub(crate) fn edges_from<'tx, T: KvRead>(
        &self,
        tx: &'tx T,
        from: NodeKey,
        filter: EdgeTypeFilter,
    ) -> Result<EdgeScan<'tx, T>> {
        self.metrics.adjacency_scan("edges");
        EdgeScan::open(tx, &keys::edge_key_prefix(from), filter)
    }

    /// Distinct nodes reachable from `node` in one hop over edges accepted
    /// by `filter`.
    pub fn get_adjacent_of<'tx, T: KvRead>(
        &self,
        tx: &'tx T,
        node: &Node,
        filter: impl Into<EdgeTypeFilter>,
    ) -> Result<AdjacentNodes<'tx, T>> {
        Ok(self.adjacent_of(tx, node.key, filter.into())?.nodes())
    }

    /// Like [`GraphQueries::get_adjacent_of`], also yielding the edge that
    /// first reached each destination.
    pub fn adjacent_of<'tx, T: KvRead>(
        &self,
        tx: &'tx T,
        from: NodeKey,
        filter: EdgeTypeFilter,
    ) -> Result<AdjacentScan<'tx, T>> {
        self.metrics.adjacency_scan("adjacent");
        let edges = EdgeScan::open(tx, &keys::edge_key_prefix(from), filter)?;
        Ok(AdjacentScan::new(tx, edges, Arc::clone(&self.metrics)))
    }

    /// Outgoing edges of `from` that end at `to`, optionally of one type.
    pub fn get_edges_between<'tx, T: KvRead>(
        &self,
        tx: &'tx T,
        from: &Node,
        to: &Node,
        ty: Option<EdgeType>,
    ) -> Result<EdgeScan<'tx, T>> {
        self.metrics.adjacency_scan("between");
        EdgeScan::open(
            tx,
            &keys::edge_key_prefix_between(from.key, to.key),
            EdgeTypeFilter::from(ty),
        )
    }

    /// Whether `node` has no outgoing edges.
    pub fn is_isolated<T: KvRead>(&self, tx: &T, node: &Node) -> Result<bool> {
        self.metrics.adjacency_scan("isolation");
        let prefix = keys::edge_key_prefix(node.key);
        let mut cursor = tx.iterate(Tree::Edges)?;
        cursor.set_required_prefix(&prefix);
        Ok(!cursor.seek(&prefix)?)
    }

    /// Reads one field of the graph metadata document.
    ///
    /// Returns `None` when the metadata record or the field is absent. A
    /// record that is not a JSON object, or a field that does not decode as
    /// `V`, is reported as corrupt.
    pub fn get_from_system_metadata<T: KvRead, V: DeserializeOwned>(
        &self,
        tx: &T,
        field: &str,
    ) -> Result<Option<V>> {
        let Some(found) = tx.read(Tree::System, SYSTEM_METADATA_KEY)? else {
            return Ok(None);
        };
        let document: Value = serde_json::from_slice(&found.value)
            .map_err(|err| GraphError::corrupt(format!("system metadata: {err}")))?;
        let Value::Object(mut fields) = document else {
            return Err(GraphError::corrupt("system metadata is not an object"));
        };
        match fields.remove(field) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| GraphError::corrupt(format!("system metadata field {field}: {err}"))),
            None => Ok(None),
        }
    }
}
