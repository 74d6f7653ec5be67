//! # taproot — Disk-Oriented B-Tree Index Core
//!
//! taproot is the algorithmic core of an on-disk ordered index,
//! parameterised over fixed-size keys and fixed-size values. It owns the
//! node byte format and the B-Tree algorithms — search, insert, append,
//! bounded range scan, iteration — but performs no I/O and no storage
//! allocation itself. Every operation is a suspendable computation that
//! tells the caller which bytes to read, how much fresh storage to reserve,
//! and finally which blocks to write; the caller drives it forward against
//! whatever backing store it owns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Session (driver + tree handle)        │
//! ├─────────────────────────────────────────┤
//! │   Storage drivers (MemStorage, File)    │
//! ├─────────────────────────────────────────┤
//! │   I/O protocol (Step: Done/Read/Alloc)  │
//! ├─────────────────────────────────────────┤
//! │   Algorithms (BTree: find/insert/...)   │
//! ├─────────────────────────────────────────┤
//! │   Node layout (Node/NodeMut over bytes) │
//! ├─────────────────────────────────────────┤
//! │   Codec (fixed-width keys and values)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The same core runs against an in-memory buffer, a regular file, a block
//! device or any custom store — the driver just answers read and allocate
//! requests and applies write batches.
//!
//! ## Quick start
//!
//! ```
//! use taproot::{MemStorage, Session};
//!
//! # fn main() -> eyre::Result<()> {
//! let mut index: Session<u64, u64, MemStorage> =
//!     Session::create(MemStorage::new(), 5)?;
//!
//! index.insert(1, 100)?;
//! index.insert(2, 200)?;
//! index.insert(2, 250)?; // overwrites in place
//!
//! assert_eq!(index.find(1)?, Some(100));
//! assert_eq!(index.find(2)?, Some(250));
//! assert_eq!(index.last()?, Some((2, 250)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving the protocol by hand
//!
//! `Session` and [`run`] are conveniences; the protocol itself is three
//! enum cases and can be pumped by any loop:
//!
//! ```
//! use taproot::{BTree, MemStorage, Step, Storage};
//!
//! # fn main() -> eyre::Result<()> {
//! let mut storage = MemStorage::new();
//! let created = taproot::run(&mut storage, BTree::<u64, u64>::create(3))?;
//! storage.apply(&created.writes)?;
//! let tree = created.tree;
//!
//! let mut step = tree.find(42);
//! let result = loop {
//!     step = match step {
//!         Step::Done(value) => break value,
//!         Step::Read { block, cont } => cont(storage.read(block)?),
//!         Step::Alloc { len, cont } => cont(storage.allocate(len)?),
//!     };
//! };
//! assert_eq!(result, None);
//! # Ok(())
//! # }
//! ```
//!
//! ## Durability model
//!
//! Mutations are pre-commit: reads and allocations happen while the
//! operation runs, writes are handed back in one ordered batch at the end
//! (`Commit::writes`). Apply the batch and the new tree exists; drop it and
//! the stored tree is exactly what it was. The caller persists the pair
//! `(root offset, order)` — a root split reports the replacement offset in
//! `Commit::new_root`, and `FileStorage` offers a header block to keep the
//! pair in.
//!
//! There is no deletion, no concurrent mutation and no caching layer;
//! storage grows monotonically and nodes are rewritten whole.
//!
//! ## Module Overview
//!
//! - [`codec`]: fixed-width key/value encode/decode traits and stock impls
//! - [`node`]: node byte layout and borrowed views over node blocks
//! - [`io`]: the suspendable protocol (`Step`, `Block`, `WriteOp`)
//! - [`tree`]: the tree handle and all algorithms
//! - [`storage`]: driver trait, protocol pump, in-memory and mmap drivers

#[macro_use]
mod macros;

pub mod codec;
pub mod io;
pub mod node;
pub mod storage;
pub mod tree;

pub use codec::{Codec, KeyCodec};
pub use io::{Block, Step, WriteOp};
pub use node::{NodeLayout, NO_CHILD};
pub use storage::{run, FileStorage, MemStorage, Session, Storage};
pub use tree::{BTree, Commit, Created};
