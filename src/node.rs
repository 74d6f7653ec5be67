//! # Node Byte Layout
//!
//! This module maps a logical B-Tree node onto a contiguous fixed-length
//! byte block. A tree of order `m` stores up to `m-1` key/value pairs and
//! `m` child offsets per node, at fixed strides determined by the codec
//! widths:
//!
//! ```text
//! Offset                    Size        Field
//! ------                    ----        -----
//! 0                         4           nb_of_vals (u32 LE)
//! 4                         (m-1)*Kw    key[0] .. key[m-2]
//! 4 + (m-1)*Kw              (m-1)*Vw    val[0] .. val[m-2]
//! 4 + (m-1)*(Kw+Vw)         m*8         subtree[0] .. subtree[m-1] (i64 LE)
//! ```
//!
//! Total block length: `4 + (m-1)*(Kw+Vw) + m*8`. Only the first
//! `nb_of_vals` key/value slots and the first `nb_of_vals + 1` subtree
//! slots are meaningful. The reserved subtree value `-1` ([`NO_CHILD`])
//! marks an absent child; a node is a leaf iff its used subtree slots are
//! all `-1`. A freshly allocated, still-zeroed block with a zero count also
//! reads as an empty leaf, since storage may hand back zero-filled regions.
//!
//! ## Views
//!
//! [`Node`] and [`NodeMut`] borrow a block already present in memory and
//! expose typed accessors over it. They perform no I/O; fetching and
//! persisting blocks is the caller's side of the protocol (see `io`).
//! All accessors bounds-check their slot index; handing a view a block of
//! the wrong length, or indexing past the meaningful slots, is a caller
//! bug and panics.
//!
//! ## Search
//!
//! `search` is a linear scan with early exit, returning the smallest slot
//! whose key is greater than or equal to the probe — `Found` on equality,
//! `NotFound(i)` with the insertion point (equivalently the child to
//! descend into) otherwise.

use std::cmp::Ordering;
use std::marker::PhantomData;

use eyre::{ensure, Result};
use zerocopy::little_endian::{I64, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codec::{Codec, KeyCodec};
use crate::io::Block;

pub const NODE_HEADER_SIZE: usize = 4;
pub const SUBTREE_SLOT_SIZE: usize = 8;

/// Reserved subtree offset marking "no child".
pub const NO_CHILD: i64 = -1;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeHeader {
    nb_of_vals: U32,
}

const _: () = assert!(std::mem::size_of::<NodeHeader>() == NODE_HEADER_SIZE);

impl NodeHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= NODE_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            NODE_HEADER_SIZE
        );

        Self::ref_from_bytes(&data[..NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= NODE_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            NODE_HEADER_SIZE
        );

        Self::mut_from_bytes(&mut data[..NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    zerocopy_accessors! {
        nb_of_vals: u32,
    }
}

/// Slot geometry of a node block for a tree of a given order.
pub struct NodeLayout<K, V> {
    order: u32,
    _codec: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Clone for NodeLayout<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeLayout<K, V> {}

impl<K, V> std::fmt::Debug for NodeLayout<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLayout").field("order", &self.order).finish()
    }
}

impl<K: Codec, V: Codec> NodeLayout<K, V> {
    pub fn new(order: u32) -> Self {
        assert!(order >= 3, "tree order must be at least 3, got {order}");
        Self {
            order,
            _codec: PhantomData,
        }
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Maximum number of keys a node can hold (`m - 1`).
    pub fn max_keys(&self) -> usize {
        self.order as usize - 1
    }

    /// Minimum number of keys a non-root node must hold (`⌈m/2⌉ - 1`).
    pub fn min_keys(&self) -> usize {
        (self.order as usize - 1) / 2
    }

    /// Byte length of one node block.
    pub fn node_len(&self) -> usize {
        NODE_HEADER_SIZE
            + self.max_keys() * (K::WIDTH + V::WIDTH)
            + self.order as usize * SUBTREE_SLOT_SIZE
    }

    /// The block occupied by the node at `offset`.
    pub fn block_at(&self, offset: i64) -> Block {
        Block::new(offset, self.node_len() as u64)
    }

    fn key_offset(&self, index: usize) -> usize {
        NODE_HEADER_SIZE + index * K::WIDTH
    }

    fn val_offset(&self, index: usize) -> usize {
        NODE_HEADER_SIZE + self.max_keys() * K::WIDTH + index * V::WIDTH
    }

    fn subtree_offset(&self, index: usize) -> usize {
        NODE_HEADER_SIZE
            + self.max_keys() * (K::WIDTH + V::WIDTH)
            + index * SUBTREE_SLOT_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Found(usize),
    NotFound(usize),
}

/// Shared view over a node block.
#[derive(Debug)]
pub struct Node<'a, K, V> {
    layout: NodeLayout<K, V>,
    data: &'a [u8],
}

/// Mutable view over a node block.
pub struct NodeMut<'a, K, V> {
    layout: NodeLayout<K, V>,
    data: &'a mut [u8],
}

impl<'a, K: KeyCodec, V: Codec> Node<'a, K, V> {
    pub fn new(layout: NodeLayout<K, V>, data: &'a [u8]) -> Self {
        assert!(
            data.len() == layout.node_len(),
            "node block length mismatch: {} != {}",
            data.len(),
            layout.node_len()
        );
        Self { layout, data }
    }

    /// Number of keys (equivalently values) currently stored.
    pub fn len(&self) -> usize {
        NodeHeader::from_bytes(self.data).unwrap().nb_of_vals() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn key_at(&self, index: usize) -> K {
        assert!(
            index < self.len(),
            "key index {} out of bounds (nb_of_vals={})",
            index,
            self.len()
        );
        K::decode(self.data, self.layout.key_offset(index))
    }

    pub fn val_at(&self, index: usize) -> V {
        assert!(
            index < self.len(),
            "value index {} out of bounds (nb_of_vals={})",
            index,
            self.len()
        );
        V::decode(self.data, self.layout.val_offset(index))
    }

    pub fn subtree_at(&self, index: usize) -> i64 {
        assert!(
            index <= self.len() && index < self.layout.order() as usize,
            "subtree index {} out of bounds (nb_of_vals={})",
            index,
            self.len()
        );
        self.subtree_raw(index)
    }

    fn subtree_raw(&self, index: usize) -> i64 {
        let offset = self.layout.subtree_offset(index);
        I64::read_from_bytes(&self.data[offset..offset + SUBTREE_SLOT_SIZE])
            .unwrap()
            .get()
    }

    /// A node is a leaf iff its used subtree slots hold no child. Fresh
    /// zero-filled blocks (count 0, subtree slot 0 still zero) qualify.
    pub fn is_leaf(&self) -> bool {
        let first = self.subtree_raw(0);
        if self.len() == 0 {
            return first == NO_CHILD || first == 0;
        }
        first == NO_CHILD
    }

    /// Finds the smallest slot whose key is `>= key`.
    pub fn search(&self, key: &K) -> SearchResult {
        for i in 0..self.len() {
            match self.key_at(i).cmp(key) {
                Ordering::Less => continue,
                Ordering::Equal => return SearchResult::Found(i),
                Ordering::Greater => return SearchResult::NotFound(i),
            }
        }
        SearchResult::NotFound(self.len())
    }

    /// Index of the first key strictly greater than `key` (or `len`).
    pub fn first_greater(&self, key: &K) -> usize {
        match self.search(key) {
            SearchResult::Found(i) => i + 1,
            SearchResult::NotFound(i) => i,
        }
    }
}

impl<'a, K: KeyCodec, V: Codec> NodeMut<'a, K, V> {
    pub fn new(layout: NodeLayout<K, V>, data: &'a mut [u8]) -> Self {
        assert!(
            data.len() == layout.node_len(),
            "node block length mismatch: {} != {}",
            data.len(),
            layout.node_len()
        );
        Self { layout, data }
    }

    pub fn as_ref(&self) -> Node<'_, K, V> {
        Node {
            layout: self.layout,
            data: self.data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets the block to a canonical empty leaf: zero count, zeroed
    /// slots, every subtree set to [`NO_CHILD`].
    pub fn init_empty(&mut self) {
        self.data.fill(0);
        for i in 0..self.layout.order() as usize {
            self.set_subtree(i, NO_CHILD);
        }
    }

    pub fn set_len(&mut self, count: usize) {
        assert!(
            count <= self.layout.max_keys(),
            "nb_of_vals {} exceeds capacity {}",
            count,
            self.layout.max_keys()
        );
        NodeHeader::from_bytes_mut(self.data)
            .unwrap()
            .set_nb_of_vals(count as u32);
    }

    pub fn set_key(&mut self, index: usize, key: &K) {
        assert!(
            index < self.layout.max_keys(),
            "key index {} out of bounds (order={})",
            index,
            self.layout.order()
        );
        key.encode(self.data, self.layout.key_offset(index));
    }

    pub fn set_val(&mut self, index: usize, val: &V) {
        assert!(
            index < self.layout.max_keys(),
            "value index {} out of bounds (order={})",
            index,
            self.layout.order()
        );
        val.encode(self.data, self.layout.val_offset(index));
    }

    pub fn set_subtree(&mut self, index: usize, offset: i64) {
        assert!(
            index < self.layout.order() as usize,
            "subtree index {} out of bounds (order={})",
            index,
            self.layout.order()
        );
        let at = self.layout.subtree_offset(index);
        self.data[at..at + SUBTREE_SLOT_SIZE].copy_from_slice(I64::new(offset).as_bytes());
    }

    /// Inserts `(key, val)` at slot `pos`, shifting later slots right, and
    /// hangs `right` as the subtree immediately after the new key. Leaves
    /// pass [`NO_CHILD`], which keeps the subtree array all-sentinel.
    pub fn insert_entry(&mut self, pos: usize, key: &K, val: &V, right: i64) {
        let count = self.len();
        assert!(
            count < self.layout.max_keys(),
            "insert into full node (nb_of_vals={count})"
        );
        assert!(pos <= count, "insert position {pos} out of bounds ({count})");

        let layout = self.layout;
        let ko = |i| layout.key_offset(i);
        let vo = |i| layout.val_offset(i);
        let so = |i| layout.subtree_offset(i);

        self.data.copy_within(ko(pos)..ko(count), ko(pos + 1));
        self.data.copy_within(vo(pos)..vo(count), vo(pos + 1));
        self.data.copy_within(so(pos + 1)..so(count + 1), so(pos + 2));

        self.set_key(pos, key);
        self.set_val(pos, val);
        self.set_subtree(pos + 1, right);
        self.set_len(count + 1);
    }
}
