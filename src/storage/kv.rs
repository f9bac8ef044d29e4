//! Contract the graph layer requires from the underlying ordered,
//! versioned key-value store.

use crate::types::Result;

/// Logical trees addressed inside one transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tree {
    /// Node records keyed by encoded node key.
    Nodes,
    /// Edge records keyed by encoded edge key.
    Edges,
    /// System-level metadata records.
    System,
}

impl Tree {
    pub(crate) const ALL: [Tree; 3] = [Tree::Nodes, Tree::Edges, Tree::System];

    pub(crate) const fn index(self) -> usize {
        match self {
            Tree::Nodes => 0,
            Tree::Edges => 1,
            Tree::System => 2,
        }
    }

    /// Stable name of the tree.
    pub const fn name(self) -> &'static str {
        match self {
            Tree::Nodes => "nodes",
            Tree::Edges => "edges",
            Tree::System => "system",
        }
    }
}

/// A value read from a tree together with its version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadResult {
    /// Edit counter of the key, always greater than zero for present keys.
    pub version: u64,
    /// Stored value bytes.
    pub value: Vec<u8>,
}

/// Forward-only cursor over one tree.
///
/// After [`TreeCursor::seek`] or [`TreeCursor::move_next`] returns `true`,
/// the current key and value are valid until the next positioning call.
pub trait TreeCursor {
    /// Restricts the cursor to keys starting with `prefix`.
    fn set_required_prefix(&mut self, prefix: &[u8]);

    /// Positions on the first key `>= start` that satisfies the prefix.
    fn seek(&mut self, start: &[u8]) -> Result<bool>;

    /// Advances to the next key that satisfies the prefix.
    fn move_next(&mut self) -> Result<bool>;

    /// Key at the current position.
    fn current_key(&self) -> &[u8];

    /// Value at the current position.
    fn current_value(&self) -> &[u8];
}

/// Read access within a transaction.
pub trait KvRead {
    /// Cursor type, bound to the lifetime of the transaction borrow.
    type Cursor<'a>: TreeCursor
    where
        Self: 'a;

    /// Point lookup.
    fn read(&self, tree: Tree, key: &[u8]) -> Result<Option<ReadResult>>;

    /// Version of a key; `0` means the key does not exist.
    fn read_version(&self, tree: Tree, key: &[u8]) -> Result<u64>;

    /// Opens a forward cursor over `tree`.
    fn iterate(&self, tree: Tree) -> Result<Self::Cursor<'_>>;
}

/// Write access within a transaction.
pub trait KvWrite: KvRead {
    /// Inserts or replaces a value, bumping the key's version.
    fn put(&mut self, tree: Tree, key: &[u8], value: &[u8]) -> Result<()>;

    /// Removes a key; returns whether it existed.
    fn delete(&mut self, tree: Tree, key: &[u8]) -> Result<bool>;
}
