//! Lazy, forward-only scans over the edge tree.

use std::iter::FusedIterator;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::warn;

use crate::storage::kv::{KvRead, Tree, TreeCursor};
use crate::storage::{Edge, EdgeKey, GraphMetrics, Node};
use crate::types::{EdgeType, NodeKey, Result};

use super::queries::load_node_with;

/// Edge-type restriction applied by scans.
///
/// Converting from a bare [`EdgeType`] treats `0` as [`EdgeTypeFilter::Any`];
/// use [`EdgeTypeFilter::Only`] to select type `0` literally.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum EdgeTypeFilter {
    /// Every edge type matches.
    #[default]
    Any,
    /// Only edges of this type match.
    Only(EdgeType),
}

impl EdgeTypeFilter {
    /// Whether an edge of type `ty` passes the filter.
    pub fn matches(self, ty: EdgeType) -> bool {
        match self {
            EdgeTypeFilter::Any => true,
            EdgeTypeFilter::Only(wanted) => wanted == ty,
        }
    }
}

impl From<EdgeType> for EdgeTypeFilter {
    fn from(ty: EdgeType) -> Self {
        if ty == 0 {
            EdgeTypeFilter::Any
        } else {
            EdgeTypeFilter::Only(ty)
        }
    }
}

impl From<Option<EdgeType>> for EdgeTypeFilter {
    fn from(ty: Option<EdgeType>) -> Self {
        ty.map_or(EdgeTypeFilter::Any, EdgeTypeFilter::Only)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ScanState {
    Pending,
    Active,
    Done,
}

/// Prefix scan yielding decoded edges.
///
/// The scan positions its cursor on the first call to `next`, reads each
/// record as it is reached and cannot be restarted. A malformed record is
/// reported as an `Err` item at the point it is decoded, after which the scan
/// is exhausted.
pub struct EdgeScan<'tx, T: KvRead + 'tx> {
    cursor: T::Cursor<'tx>,
    prefix: Vec<u8>,
    filter: EdgeTypeFilter,
    state: ScanState,
}

impl<'tx, T: KvRead + 'tx> EdgeScan<'tx, T> {
    pub(crate) fn open(tx: &'tx T, prefix: &[u8], filter: EdgeTypeFilter) -> Result<Self> {
        let mut cursor = tx.iterate(Tree::Edges)?;
        cursor.set_required_prefix(prefix);
        Ok(Self {
            cursor,
            prefix: prefix.to_vec(),
            filter,
            state: ScanState::Pending,
        })
    }

    fn step(&mut self) -> Result<bool> {
        let found = match self.state {
            ScanState::Pending => self.cursor.seek(&self.prefix)?,
            ScanState::Active => self.cursor.move_next()?,
            ScanState::Done => return Ok(false),
        };
        self.state = if found {
            ScanState::Active
        } else {
            ScanState::Done
        };
        Ok(found)
    }

    fn next_key(&mut self) -> Result<Option<EdgeKey>> {
        while self.step()? {
            let key = EdgeKey::decode(self.cursor.current_key())?;
            if self.filter.matches(key.ty) {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    fn next_edge(&mut self) -> Result<Option<Edge>> {
        match self.next_key()? {
            Some(key) => Edge::from_record(key, self.cursor.current_value()).map(Some),
            None => Ok(None),
        }
    }

    /// Whether the scan has reached its end.
    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }
}

impl<'tx, T: KvRead + 'tx> Iterator for EdgeScan<'tx, T> {
    type Item = Result<Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_edge() {
            Ok(Some(edge)) => Some(Ok(edge)),
            Ok(None) => None,
            Err(err) => {
                self.state = ScanState::Done;
                Some(Err(err))
            }
        }
    }
}

impl<'tx, T: KvRead + 'tx> FusedIterator for EdgeScan<'tx, T> {}

/// An outgoing edge paired with the node it leads to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjacent {
    pub edge: Edge,
    pub node: Node,
}

/// Scan over the distinct destinations of a node's outgoing edges.
///
/// Each destination key is yielded once per scan, through the first matching
/// edge that reaches it. Edges whose destination record is missing are
/// skipped.
pub struct AdjacentScan<'tx, T: KvRead + 'tx> {
    tx: &'tx T,
    edges: EdgeScan<'tx, T>,
    seen: FxHashSet<NodeKey>,
    metrics: Arc<dyn GraphMetrics>,
}

impl<'tx, T: KvRead + 'tx> AdjacentScan<'tx, T> {
    pub(crate) fn new(
        tx: &'tx T,
        edges: EdgeScan<'tx, T>,
        metrics: Arc<dyn GraphMetrics>,
    ) -> Self {
        Self {
            tx,
            edges,
            seen: FxHashSet::default(),
            metrics,
        }
    }

    fn next_adjacent(&mut self) -> Result<Option<Adjacent>> {
        loop {
            let Some(edge) = self.edges.next().transpose()? else {
                return Ok(None);
            };
            if !self.seen.insert(edge.key.to) {
                continue;
            }
            match load_node_with(self.tx, edge.key.to, self.metrics.as_ref())? {
                Some(node) => return Ok(Some(Adjacent { edge, node })),
                None => {
                    warn!(edge = %edge.key, "edge points at a missing node, skipping");
                }
            }
        }
    }

    /// Narrows the scan to destination nodes only.
    pub fn nodes(self) -> AdjacentNodes<'tx, T> {
        AdjacentNodes { inner: self }
    }
}

impl<'tx, T: KvRead + 'tx> Iterator for AdjacentScan<'tx, T> {
    type Item = Result<Adjacent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_adjacent().transpose()
    }
}

/// Destination nodes of an [`AdjacentScan`].
pub struct AdjacentNodes<'tx, T: KvRead + 'tx> {
    inner: AdjacentScan<'tx, T>,
}

impl<'tx, T: KvRead + 'tx> Iterator for AdjacentNodes<'tx, T> {
    type Item = Result<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|item| item.map(|adjacent| adjacent.node))
    }
}
