//! In-memory ordered, versioned key-value store.
//!
//! Read transactions pin an immutable snapshot of all trees. A single write
//! transaction at a time works on a private copy and publishes it on commit;
//! dropping it uncommitted discards the changes.

use std::collections::btree_map::Range;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::{lock_api::ArcMutexGuard, Mutex, RawMutex, RwLock};
use tracing::trace;

use crate::types::Result;

use super::kv::{KvRead, KvWrite, ReadResult, Tree, TreeCursor};

#[derive(Clone, Debug)]
struct Entry {
    version: u64,
    value: Arc<[u8]>,
}

type TreeMap = BTreeMap<Vec<u8>, Entry>;

#[derive(Clone, Debug, Default)]
struct Trees([TreeMap; 3]);

impl Trees {
    fn tree(&self, tree: Tree) -> &TreeMap {
        &self.0[tree.index()]
    }

    fn tree_mut(&mut self, tree: Tree) -> &mut TreeMap {
        &mut self.0[tree.index()]
    }

    fn read(&self, tree: Tree, key: &[u8]) -> Option<ReadResult> {
        self.tree(tree).get(key).map(|entry| ReadResult {
            version: entry.version,
            value: entry.value.to_vec(),
        })
    }

    fn read_version(&self, tree: Tree, key: &[u8]) -> u64 {
        self.tree(tree).get(key).map_or(0, |entry| entry.version)
    }
}

#[derive(Default)]
struct Shared {
    committed: RwLock<Arc<Trees>>,
    writer: Arc<Mutex<()>>,
}

/// Cheaply clonable handle to an in-memory store.
#[derive(Clone, Default)]
pub struct MemStore {
    shared: Arc<Shared>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a read transaction over the latest committed state.
    pub fn begin_read(&self) -> ReadTx {
        ReadTx {
            trees: Arc::clone(&self.shared.committed.read()),
        }
    }

    /// Begins the write transaction, blocking while another one is open.
    pub fn begin_write(&self) -> WriteTx {
        let guard = self.shared.writer.lock_arc();
        let base = Arc::clone(&self.shared.committed.read());
        WriteTx {
            shared: Arc::clone(&self.shared),
            trees: (*base).clone(),
            _writer: guard,
        }
    }

    /// Number of committed records in `tree`.
    pub fn len(&self, tree: Tree) -> usize {
        self.shared.committed.read().tree(tree).len()
    }

    /// Whether every tree is empty.
    pub fn is_empty(&self) -> bool {
        let trees = self.shared.committed.read();
        Tree::ALL.iter().all(|tree| trees.tree(*tree).is_empty())
    }
}

impl fmt::Debug for MemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trees = self.shared.committed.read();
        f.debug_struct("MemStore")
            .field("nodes", &trees.tree(Tree::Nodes).len())
            .field("edges", &trees.tree(Tree::Edges).len())
            .field("system", &trees.tree(Tree::System).len())
            .finish()
    }
}

/// Snapshot read transaction.
#[derive(Clone, Debug)]
pub struct ReadTx {
    trees: Arc<Trees>,
}

impl KvRead for ReadTx {
    type Cursor<'a> = MemCursor<'a>;

    fn read(&self, tree: Tree, key: &[u8]) -> Result<Option<ReadResult>> {
        Ok(self.trees.read(tree, key))
    }

    fn read_version(&self, tree: Tree, key: &[u8]) -> Result<u64> {
        Ok(self.trees.read_version(tree, key))
    }

    fn iterate(&self, tree: Tree) -> Result<MemCursor<'_>> {
        Ok(MemCursor::new(self.trees.tree(tree)))
    }
}

/// Exclusive write transaction; sees its own uncommitted writes.
pub struct WriteTx {
    shared: Arc<Shared>,
    trees: Trees,
    _writer: ArcMutexGuard<RawMutex, ()>,
}

impl WriteTx {
    /// Publishes all writes atomically and releases the writer lock.
    pub fn commit(self) -> Result<()> {
        let WriteTx {
            shared,
            trees,
            _writer,
        } = self;
        *shared.committed.write() = Arc::new(trees);
        trace!("mem store commit published");
        Ok(())
    }
}

impl KvRead for WriteTx {
    type Cursor<'a> = MemCursor<'a>;

    fn read(&self, tree: Tree, key: &[u8]) -> Result<Option<ReadResult>> {
        Ok(self.trees.read(tree, key))
    }

    fn read_version(&self, tree: Tree, key: &[u8]) -> Result<u64> {
        Ok(self.trees.read_version(tree, key))
    }

    fn iterate(&self, tree: Tree) -> Result<MemCursor<'_>> {
        Ok(MemCursor::new(self.trees.tree(tree)))
    }
}

impl KvWrite for WriteTx {
    fn put(&mut self, tree: Tree, key: &[u8], value: &[u8]) -> Result<()> {
        let map = self.trees.tree_mut(tree);
        let version = map.get(key).map_or(0, |entry| entry.version) + 1;
        map.insert(
            key.to_vec(),
            Entry {
                version,
                value: Arc::from(value),
            },
        );
        Ok(())
    }

    fn delete(&mut self, tree: Tree, key: &[u8]) -> Result<bool> {
        Ok(self.trees.tree_mut(tree).remove(key).is_some())
    }
}

/// Prefix-restricted forward cursor over one in-memory tree.
pub struct MemCursor<'a> {
    tree: &'a TreeMap,
    prefix: Vec<u8>,
    range: Option<Range<'a, Vec<u8>, Entry>>,
    current: Option<(&'a [u8], &'a [u8])>,
}

impl<'a> MemCursor<'a> {
    fn new(tree: &'a TreeMap) -> Self {
        Self {
            tree,
            prefix: Vec::new(),
            range: None,
            current: None,
        }
    }

    fn advance(&mut self) -> bool {
        let next = self.range.as_mut().and_then(Iterator::next);
        match next {
            Some((key, entry)) if key.starts_with(&self.prefix) => {
                self.current = Some((key.as_slice(), &entry.value[..]));
                true
            }
            _ => {
                // Keys sharing a prefix are contiguous, so the first miss ends the scan.
                self.current = None;
                self.range = None;
                false
            }
        }
    }
}

impl TreeCursor for MemCursor<'_> {
    fn set_required_prefix(&mut self, prefix: &[u8]) {
        self.prefix = prefix.to_vec();
    }

    fn seek(&mut self, start: &[u8]) -> Result<bool> {
        let lower: &[u8] = if start < self.prefix.as_slice() {
            &self.prefix
        } else {
            start
        };
        self.range = Some(
            self.tree
                .range::<[u8], _>((Bound::Included(lower), Bound::Unbounded)),
        );
        Ok(self.advance())
    }

    fn move_next(&mut self) -> Result<bool> {
        if self.range.is_none() {
            return Ok(false);
        }
        Ok(self.advance())
    }

    fn current_key(&self) -> &[u8] {
        match self.current {
            Some((key, _)) => key,
            None => &[],
        }
    }

    fn current_value(&self) -> &[u8] {
        match self.current {
            Some((_, value)) => value,
            None => &[],
        }
    }
}
