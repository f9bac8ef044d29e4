//! Graph handle shared by queries and algorithms.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::query::{GraphQueries, SYSTEM_METADATA_KEY};
use crate::storage::keys;
use crate::storage::kv::{KvWrite, Tree};
use crate::storage::{Edge, EdgeKey, Etag, EtagIssuer, GraphOptions, Node};
use crate::types::{GraphError, NodeKey, Result};

/// Entry point tying configuration to the query layer.
///
/// A `Graph` holds no store state of its own; every operation is given the
/// transaction it runs in. Algorithms keep an `Arc<Graph>` for the whole run.
#[derive(Debug)]
pub struct Graph {
    options: GraphOptions,
    queries: GraphQueries,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}

impl Graph {
    pub fn new(options: GraphOptions) -> Self {
        let queries = GraphQueries::new(Arc::clone(&options.metrics));
        Self { options, queries }
    }

    /// Convenience constructor returning the shared handle algorithms expect.
    pub fn shared(options: GraphOptions) -> Arc<Self> {
        Arc::new(Self::new(options))
    }

    pub fn queries(&self) -> &GraphQueries {
        &self.queries
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Issues a fresh etag from the configured issuer.
    pub fn next_etag(&self) -> Etag {
        match self.options.etag_issuer.as_deref() {
            Some(issuer) => issuer.issue(),
            None => EtagIssuer::global().issue(),
        }
    }

    /// Inserts or replaces a node record, stamping it with a new etag.
    pub fn put_node<T: KvWrite>(
        &self,
        tx: &mut T,
        key: NodeKey,
        payload: impl Into<Bytes>,
    ) -> Result<Node> {
        let node = Node::new(key, payload).with_etag(self.next_etag());
        tx.put(Tree::Nodes, &node.encoded_key(), &node.to_record())?;
        Ok(node)
    }

    /// Inserts or replaces an edge record. Both endpoints must exist.
    pub fn put_edge<T: KvWrite>(
        &self,
        tx: &mut T,
        key: EdgeKey,
        weight: i64,
        payload: impl Into<Bytes>,
    ) -> Result<Edge> {
        if !self.queries.contains_node(tx, key.from)? {
            return Err(GraphError::InvalidArgument("edge source node does not exist"));
        }
        if !self.queries.contains_node(tx, key.to)? {
            return Err(GraphError::InvalidArgument(
                "edge destination node does not exist",
            ));
        }
        let edge = Edge::new(key, weight, payload).with_etag(self.next_etag());
        tx.put(Tree::Edges, &key.encode(), &edge.to_record())?;
        Ok(edge)
    }

    /// Removes a node together with its outgoing edges.
    ///
    /// Incoming edges are left in place; scans skip them once their
    /// destination is gone.
    pub fn delete_node<T: KvWrite>(&self, tx: &mut T, key: NodeKey) -> Result<bool> {
        let outgoing = {
            let node = Node::new(key, Bytes::new());
            self.queries
                .get_edges_of(&*tx, &node)?
                .map(|edge| edge.map(|e| e.key))
                .collect::<Result<Vec<_>>>()?
        };
        for edge in &outgoing {
            tx.delete(Tree::Edges, &edge.encode())?;
        }
        let existed = tx.delete(Tree::Nodes, &keys::encode_node_key(key))?;
        if existed {
            debug!(node = key, edges = outgoing.len(), "node deleted");
        }
        Ok(existed)
    }

    pub fn delete_edge<T: KvWrite>(&self, tx: &mut T, key: &EdgeKey) -> Result<bool> {
        tx.delete(Tree::Edges, &key.encode())
    }

    /// Sets one field of the graph metadata document, creating the document
    /// when it does not exist yet.
    pub fn put_system_metadata<T: KvWrite, V: Serialize>(
        &self,
        tx: &mut T,
        field: &str,
        value: &V,
    ) -> Result<()> {
        let mut fields = match tx.read(Tree::System, SYSTEM_METADATA_KEY)? {
            Some(found) => match serde_json::from_slice(&found.value) {
                Ok(Value::Object(fields)) => fields,
                Ok(_) => return Err(GraphError::corrupt("system metadata is not an object")),
                Err(err) => return Err(GraphError::corrupt(format!("system metadata: {err}"))),
            },
            None => Map::new(),
        };
        let value = serde_json::to_value(value)
            .map_err(|_| GraphError::InvalidArgument("metadata value is not serialisable"))?;
        fields.insert(field.to_owned(), value);
        let encoded = serde_json::to_vec(&Value::Object(fields))
            .map_err(|err| GraphError::corrupt(format!("system metadata: {err}")))?;
        tx.put(Tree::System, SYSTEM_METADATA_KEY, &encoded)
    }
}
