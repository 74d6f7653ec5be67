//! # Storage Drivers and the Protocol Pump
//!
//! The tree core asks for bytes and fresh regions through `Step` values;
//! something has to answer. This module defines that something:
//!
//! - [`Storage`] — the driver interface a backing store implements: read a
//!   block, reserve a fresh region, durably apply a write batch in order.
//! - [`run`] — the interpreter loop pumping a `Step` against a driver until
//!   it is `Done`.
//! - [`Session`] — a driver paired with a tree handle. It applies the
//!   write batch of every mutation and swaps the handle when a root split
//!   reports a replacement offset, which makes it the reference
//!   implementation of the caller side of the protocol.
//!
//! Two drivers ship with the crate:
//!
//! - [`MemStorage`] — a growable in-memory byte buffer. Fast, inspectable
//!   byte-for-byte, the natural fixture for tests.
//! - [`FileStorage`] — a memory-mapped file with a small header block that
//!   persists the tree handle (`root`, `order`) across restarts.
//!
//! Any other backing store — a block device, a remote log, a custom pager —
//! plugs in by implementing [`Storage`]; the core never learns the
//! difference.
//!
//! ## Commit discipline
//!
//! `run` only ever *reads* and *allocates* on behalf of an operation.
//! Writes happen afterwards, from the terminal payload, via
//! [`Storage::apply`]. An operation abandoned half-way therefore leaves
//! the stored tree untouched, at the cost of any regions it already
//! allocated.

mod file;
mod mem;

pub use file::{FileHeader, FileStorage, CURRENT_VERSION, FILE_HEADER_SIZE, FILE_MAGIC};
pub use mem::MemStorage;

use eyre::Result;

use crate::codec::{Codec, KeyCodec};
use crate::io::{Block, Step, WriteOp};
use crate::tree::{BTree, Commit, Created};

/// Interface the tree core needs from a backing store.
pub trait Storage {
    /// Returns the bytes currently stored at `block`.
    fn read(&self, block: Block) -> Result<&[u8]>;

    /// Reserves a fresh contiguous region of `len` bytes and returns its
    /// starting offset. Regions are never reclaimed.
    fn allocate(&mut self, len: u64) -> Result<i64>;

    /// Durably applies a batch of writes, in order.
    fn apply(&mut self, writes: &[WriteOp]) -> Result<()>;

    /// Flushes applied writes to durable storage, where that is meaningful.
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// Pumps a suspended operation against a driver until it completes.
pub fn run<S, T>(storage: &mut S, mut step: Step<T>) -> Result<T>
where
    S: Storage + ?Sized,
{
    loop {
        step = match step {
            Step::Done(value) => return Ok(value),
            Step::Read { block, cont } => cont(storage.read(block)?),
            Step::Alloc { len, cont } => {
                let offset = storage.allocate(len)?;
                cont(offset)
            }
        };
    }
}

/// A storage driver paired with the tree it backs.
///
/// Mutations run the protocol, apply the resulting write batch and track
/// root replacements. The current `(root, order)` pair is available through
/// [`Session::root`] and [`Session::order`] for the caller to persist.
pub struct Session<K, V, S> {
    storage: S,
    tree: BTree<K, V>,
}

impl<K: KeyCodec, V: Codec, S: Storage> Session<K, V, S> {
    /// Creates a fresh tree of the given order inside `storage`.
    pub fn create(mut storage: S, order: u32) -> Result<Self> {
        let created: Created<K, V> = run(&mut storage, BTree::create(order))?;
        storage.apply(&created.writes)?;
        Ok(Self {
            storage,
            tree: created.tree,
        })
    }

    /// Attaches to an existing tree from a persisted `(root, order)` pair.
    pub fn open(storage: S, root: i64, order: u32) -> Self {
        Self {
            storage,
            tree: BTree::open(root, order),
        }
    }

    pub fn tree(&self) -> &BTree<K, V> {
        &self.tree
    }

    pub fn root(&self) -> i64 {
        self.tree.root()
    }

    pub fn order(&self) -> u32 {
        self.tree.order()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let commit = run(&mut self.storage, self.tree.insert(key, value))?;
        self.commit(commit)
    }

    /// See [`BTree::append`]: only call with a key strictly greater than
    /// every key already in the tree.
    pub fn append(&mut self, key: K, value: V) -> Result<()> {
        let commit = run(&mut self.storage, self.tree.append(key, value))?;
        self.commit(commit)
    }

    fn commit(&mut self, commit: Commit) -> Result<()> {
        self.storage.apply(&commit.writes)?;
        if let Some(root) = commit.new_root {
            self.tree = BTree::open(root, self.tree.order());
        }
        Ok(())
    }

    pub fn find(&mut self, key: K) -> Result<Option<V>> {
        run(&mut self.storage, self.tree.find(key))
    }

    pub fn find_gt(&mut self, key: K, max: usize) -> Result<Vec<V>> {
        run(&mut self.storage, self.tree.find_gt(key, max))
    }

    pub fn for_each<F>(&mut self, f: F) -> Result<F>
    where
        F: FnMut(V) + 'static,
    {
        run(&mut self.storage, self.tree.for_each(f))
    }

    pub fn values(&mut self) -> Result<Vec<V>> {
        run(&mut self.storage, self.tree.values())
    }

    pub fn last(&mut self) -> Result<Option<(K, V)>> {
        run(&mut self.storage, self.tree.last())
    }

    pub fn dump(&mut self) -> Result<String> {
        run(&mut self.storage, self.tree.dump())
    }

    /// Prints the tree outline to stdout.
    pub fn debug(&mut self) -> Result<()> {
        let outline = self.dump()?;
        println!("{outline}");
        Ok(())
    }
}
