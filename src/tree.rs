//! # B-Tree Algorithms
//!
//! This module implements the tree algorithms over the node layout defined
//! in `node`, expressed entirely through the suspendable protocol of `io`.
//! A [`BTree`] is just a handle — the root offset plus the layout — and
//! every operation returns a [`Step`] the caller pumps against its storage.
//!
//! ## Handle lifecycle
//!
//! - [`BTree::create`] allocates one empty node and publishes its offset as
//!   the root.
//! - [`BTree::open`] rebuilds a handle from a persisted `(root, order)`
//!   pair; persisting that pair across restarts is the caller's job.
//! - A mutation that splits the root reports the replacement offset in
//!   [`Commit::new_root`]; the caller swaps its handle (and its persisted
//!   copy) accordingly. The order is immutable for the life of a tree.
//!
//! ## Insert and split propagation
//!
//! Insertion descends to the target leaf, rewriting nothing on the way
//! down. Each level returns an [`InsertResult`] carry to its parent:
//! either the subtree absorbed the entry, or it split and hands up the
//! median entry together with the freshly allocated right sibling. A full
//! node about to take an entry rebuilds its `m` virtual slots, keeps the
//! slots below the median index `(m-1)/2`, moves the slots above it into
//! the new sibling, and promotes the median. A carry escaping the root
//! allocates a new root holding just the median.
//!
//! Inserting an already-present key overwrites its value slot in place —
//! one node rewrite, no split, no shape change — wherever in the tree the
//! key lives.
//!
//! ## Write batching
//!
//! Mutations never emit writes mid-flight. Every rewritten node block is
//! collected into [`Commit::writes`] in child-before-parent order; each
//! write targets a block that existed (or was allocated by this very
//! operation) before it, so replaying the batch in order yields the new
//! tree and discarding it leaves the old one intact.
//!
//! ## Bounded range scans
//!
//! `find_gt` trades completeness for locality: it descends to the first
//! key strictly greater than the probe, drains what is reachable from that
//! node's own subtree array (the child left of the key, the key itself,
//! then a single bounded look at the immediate right-neighbour child's own
//! entries) and stops without descending further. Callers page through a
//! range by re-issuing the scan with the last key returned. The results
//! are always strictly ascending and strictly greater than the probe,
//! never more than `max` of them.

use std::fmt::Write as _;

use smallvec::SmallVec;

use crate::codec::{Codec, KeyCodec};
use crate::io::{Step, WriteOp};
use crate::node::{Node, NodeLayout, NodeMut, SearchResult, NO_CHILD};

/// Handle on a stored tree: root offset plus node geometry.
pub struct BTree<K, V> {
    root: i64,
    layout: NodeLayout<K, V>,
}

impl<K, V> Clone for BTree<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for BTree<K, V> {}

impl<K, V> std::fmt::Debug for BTree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTree")
            .field("root", &self.root)
            .field("layout", &self.layout)
            .finish()
    }
}

/// Terminal payload of a mutation: the ordered write batch, plus the
/// replacement root offset when the root split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub new_root: Option<i64>,
    pub writes: Vec<WriteOp>,
}

/// Terminal payload of [`BTree::create`].
#[derive(Debug)]
pub struct Created<K, V> {
    pub tree: BTree<K, V>,
    pub writes: Vec<WriteOp>,
}

/// Split carry threaded up the insert recursion.
enum InsertResult<K, V> {
    /// The subtree absorbed the entry (or overwrote in place).
    Done,
    /// The subtree split; the median entry and the new right sibling must
    /// be inserted into the parent.
    Split { key: K, val: V, right: i64 },
}

#[derive(Clone, Copy)]
enum Descent {
    /// Position by key comparison, overwriting an equal key in place.
    Sorted,
    /// Always take the rightmost slot, skipping comparisons.
    Rightmost,
}

type InsertStep<K, V> = Step<(InsertResult<K, V>, Vec<WriteOp>)>;

type Scratch<T> = SmallVec<[T; 8]>;
type SubScratch = SmallVec<[i64; 9]>;

impl<K: KeyCodec, V: Codec> BTree<K, V> {
    /// Starts a new tree of the given order: allocates one node, emits the
    /// write that formats it as an empty leaf, and returns the handle.
    pub fn create(order: u32) -> Step<Created<K, V>> {
        let layout = NodeLayout::<K, V>::new(order);
        Step::alloc(layout.node_len() as u64, move |root| {
            let mut block = vec![0u8; layout.node_len()];
            NodeMut::new(layout, &mut block).init_empty();
            Step::Done(Created {
                tree: BTree { root, layout },
                writes: vec![WriteOp::new(root, block)],
            })
        })
    }

    /// Rebuilds a handle from a persisted `(root, order)` pair.
    pub fn open(root: i64, order: u32) -> Self {
        Self {
            root,
            layout: NodeLayout::new(order),
        }
    }

    pub fn root(&self) -> i64 {
        self.root
    }

    pub fn order(&self) -> u32 {
        self.layout.order()
    }

    pub fn layout(&self) -> NodeLayout<K, V> {
        self.layout
    }

    /// Looks `key` up, yielding its value or `None`.
    pub fn find(&self, key: K) -> Step<Option<V>> {
        find_at(self.layout, self.root, key)
    }

    /// Inserts `key`, or overwrites its value in place if it is already
    /// present anywhere in the tree.
    pub fn insert(&self, key: K, value: V) -> Step<Commit> {
        mutate(self.layout, self.root, key, value, Descent::Sorted)
    }

    /// Fast-path insert for a key strictly greater than every key in the
    /// tree. Descends the right spine without comparing keys; splits
    /// propagate exactly as for [`BTree::insert`]. Feeding keys in
    /// ascending order through either entry point produces byte-identical
    /// trees.
    pub fn append(&self, key: K, value: V) -> Step<Commit> {
        mutate(self.layout, self.root, key, value, Descent::Rightmost)
    }

    /// Collects up to `max` values with keys strictly greater than `key`,
    /// ascending, bounded by locality (see the module docs).
    pub fn find_gt(&self, key: K, max: usize) -> Step<Vec<V>> {
        if max == 0 {
            return Step::Done(Vec::new());
        }
        find_gt_at(self.layout, self.root, key, max)
    }

    /// Applies `f` to every value in ascending key order, handing the
    /// closure back in the terminal step.
    pub fn for_each<F>(&self, f: F) -> Step<F>
    where
        F: FnMut(V) + 'static,
    {
        fold_at(self.layout, self.root, f, |f, val| f(val))
    }

    /// All values in ascending key order.
    pub fn values(&self) -> Step<Vec<V>> {
        fold_at(self.layout, self.root, Vec::new(), |acc, val| acc.push(val))
    }

    /// The greatest key and its value, or `None` on an empty tree.
    pub fn last(&self) -> Step<Option<(K, V)>> {
        last_at(self.layout, self.root)
    }

    /// Renders the tree as an indented outline, one node per line with its
    /// offset and keys. Diagnostic aid, not a persistence format.
    pub fn dump(&self) -> Step<String> {
        dump_at(self.layout, self.root, 0)
    }
}

fn mutate<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    root: i64,
    key: K,
    value: V,
    descent: Descent,
) -> Step<Commit> {
    insert_at(layout, root, key, value, descent, Vec::new()).and_then(move |(result, writes)| {
        match result {
            InsertResult::Done => Step::Done(Commit {
                new_root: None,
                writes,
            }),
            InsertResult::Split { key, val, right } => {
                Step::alloc(layout.node_len() as u64, move |new_root| {
                    let mut block = vec![0u8; layout.node_len()];
                    {
                        let mut node = NodeMut::new(layout, &mut block);
                        node.init_empty();
                        node.set_len(1);
                        node.set_key(0, &key);
                        node.set_val(0, &val);
                        node.set_subtree(0, root);
                        node.set_subtree(1, right);
                    }
                    let mut writes = writes;
                    writes.push(WriteOp::new(new_root, block));
                    Step::Done(Commit {
                        new_root: Some(new_root),
                        writes,
                    })
                })
            }
        }
    })
}

fn insert_at<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    offset: i64,
    key: K,
    value: V,
    descent: Descent,
    writes: Vec<WriteOp>,
) -> InsertStep<K, V> {
    Step::read(layout.block_at(offset), move |bytes| {
        let mut block = bytes.to_vec();
        let node = Node::new(layout, &block);
        let count = node.len();
        let leaf = node.is_leaf();

        let pos = match descent {
            Descent::Rightmost => count,
            Descent::Sorted => match node.search(&key) {
                SearchResult::Found(i) => {
                    NodeMut::new(layout, &mut block).set_val(i, &value);
                    let mut writes = writes;
                    writes.push(WriteOp::new(offset, block));
                    return Step::Done((InsertResult::Done, writes));
                }
                SearchResult::NotFound(i) => i,
            },
        };

        if leaf {
            return insert_here(layout, offset, block, pos, key, value, NO_CHILD, writes);
        }

        let child = node.subtree_at(pos);
        insert_at(layout, child, key, value, descent, writes).and_then(
            move |(result, writes)| match result {
                InsertResult::Done => Step::Done((InsertResult::Done, writes)),
                InsertResult::Split { key, val, right } => {
                    insert_here(layout, offset, block, pos, key, val, right, writes)
                }
            },
        )
    })
}

/// Lands an entry in the node image at `pos`, splitting when full.
#[allow(clippy::too_many_arguments)]
fn insert_here<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    offset: i64,
    mut block: Vec<u8>,
    pos: usize,
    key: K,
    val: V,
    right: i64,
    mut writes: Vec<WriteOp>,
) -> InsertStep<K, V> {
    let count = Node::new(layout, &block).len();

    if count < layout.max_keys() {
        NodeMut::new(layout, &mut block).insert_entry(pos, &key, &val, right);
        writes.push(WriteOp::new(offset, block));
        return Step::Done((InsertResult::Done, writes));
    }

    split_insert(layout, offset, block, pos, key, val, right, writes)
}

/// Splits a full node around the median of its `m` virtual slots. The
/// original block keeps the lower half, the freshly allocated sibling
/// takes the upper half, and the median is carried to the parent.
#[allow(clippy::too_many_arguments)]
fn split_insert<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    offset: i64,
    block: Vec<u8>,
    pos: usize,
    key: K,
    val: V,
    right: i64,
    writes: Vec<WriteOp>,
) -> InsertStep<K, V> {
    Step::alloc(layout.node_len() as u64, move |right_offset| {
        let order = layout.order() as usize;

        let mut keys: Scratch<K>;
        let mut vals: Scratch<V>;
        let mut subs: SubScratch;
        {
            let node = Node::new(layout, &block);
            keys = (0..node.len()).map(|i| node.key_at(i)).collect();
            vals = (0..node.len()).map(|i| node.val_at(i)).collect();
            subs = (0..=node.len()).map(|i| node.subtree_at(i)).collect();
        }
        keys.insert(pos, key);
        vals.insert(pos, val);
        subs.insert(pos + 1, right);

        let mid = (order - 1) / 2;
        let mut writes = writes;

        let mut left_block = block;
        {
            let mut left = NodeMut::new(layout, &mut left_block);
            left.init_empty();
            left.set_len(mid);
            for i in 0..mid {
                left.set_key(i, &keys[i]);
                left.set_val(i, &vals[i]);
            }
            for i in 0..=mid {
                left.set_subtree(i, subs[i]);
            }
        }
        writes.push(WriteOp::new(offset, left_block));

        let sibling_count = order - 1 - mid;
        let mut right_block = vec![0u8; layout.node_len()];
        {
            let mut sibling = NodeMut::new(layout, &mut right_block);
            sibling.init_empty();
            sibling.set_len(sibling_count);
            for i in 0..sibling_count {
                sibling.set_key(i, &keys[mid + 1 + i]);
                sibling.set_val(i, &vals[mid + 1 + i]);
            }
            for i in 0..=sibling_count {
                sibling.set_subtree(i, subs[mid + 1 + i]);
            }
        }
        writes.push(WriteOp::new(right_offset, right_block));

        Step::Done((
            InsertResult::Split {
                key: keys[mid].clone(),
                val: vals[mid].clone(),
                right: right_offset,
            },
            writes,
        ))
    })
}

fn find_at<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    offset: i64,
    key: K,
) -> Step<Option<V>> {
    Step::read(layout.block_at(offset), move |bytes| {
        let node = Node::new(layout, bytes);
        match node.search(&key) {
            SearchResult::Found(i) => Step::Done(Some(node.val_at(i))),
            SearchResult::NotFound(i) => {
                if node.is_leaf() {
                    Step::Done(None)
                } else {
                    find_at(layout, node.subtree_at(i), key)
                }
            }
        }
    })
}

fn find_gt_at<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    offset: i64,
    key: K,
    max: usize,
) -> Step<Vec<V>> {
    Step::read(layout.block_at(offset), move |bytes| {
        let node = Node::new(layout, bytes);
        let count = node.len();
        let start = node.first_greater(&key);

        if node.is_leaf() {
            let take = (count - start).min(max);
            return Step::Done((start..start + take).map(|i| node.val_at(i)).collect());
        }

        // Everything here is <= key: the strictly-greater region starts
        // somewhere below the rightmost child.
        if start == count {
            return find_gt_at(layout, node.subtree_at(count), key, max);
        }

        let bridge = node.val_at(start);
        let left = node.subtree_at(start);
        let right = node.subtree_at(start + 1);
        let right_key = key.clone();

        find_gt_at(layout, left, key, max).and_then(move |mut out| {
            if out.len() < max {
                out.push(bridge);
            }
            if out.len() < max {
                let room = max - out.len();
                take_local_gt(layout, right, right_key, room).and_then(move |tail| {
                    let mut out = out;
                    out.extend(tail);
                    Step::Done(out)
                })
            } else {
                Step::Done(out)
            }
        })
    })
}

/// One bounded look at a single node: its own values with keys strictly
/// greater than `key`, up to `max`. The node's subtrees are never entered;
/// this is the one-hop right-neighbour step of the scan.
fn take_local_gt<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    offset: i64,
    key: K,
    max: usize,
) -> Step<Vec<V>> {
    Step::read(layout.block_at(offset), move |bytes| {
        let node = Node::new(layout, bytes);
        let start = node.first_greater(&key);
        let take = (node.len() - start).min(max);
        Step::Done((start..start + take).map(|i| node.val_at(i)).collect())
    })
}

fn fold_at<K: KeyCodec, V: Codec, A, G>(
    layout: NodeLayout<K, V>,
    offset: i64,
    acc: A,
    visit: G,
) -> Step<A>
where
    A: 'static,
    G: Fn(&mut A, V) + Clone + 'static,
{
    Step::read(layout.block_at(offset), move |bytes| {
        let node = Node::new(layout, bytes);
        let count = node.len();

        if node.is_leaf() {
            let mut acc = acc;
            for i in 0..count {
                visit(&mut acc, node.val_at(i));
            }
            return Step::Done(acc);
        }

        let vals: Scratch<V> = (0..count).map(|i| node.val_at(i)).collect();
        let subs: SubScratch = (0..=count).map(|i| node.subtree_at(i)).collect();
        fold_entries(layout, vals, subs, 0, acc, visit)
    })
}

fn fold_entries<K: KeyCodec, V: Codec, A, G>(
    layout: NodeLayout<K, V>,
    vals: Scratch<V>,
    subs: SubScratch,
    slot: usize,
    acc: A,
    visit: G,
) -> Step<A>
where
    A: 'static,
    G: Fn(&mut A, V) + Clone + 'static,
{
    let child = subs[slot];
    fold_at(layout, child, acc, visit.clone()).and_then(move |mut acc| {
        if slot < vals.len() {
            visit(&mut acc, vals[slot].clone());
            fold_entries(layout, vals, subs, slot + 1, acc, visit)
        } else {
            Step::Done(acc)
        }
    })
}

fn last_at<K: KeyCodec, V: Codec>(layout: NodeLayout<K, V>, offset: i64) -> Step<Option<(K, V)>> {
    Step::read(layout.block_at(offset), move |bytes| {
        let node = Node::new(layout, bytes);
        let count = node.len();

        if count == 0 {
            return Step::Done(None);
        }
        if node.is_leaf() {
            return Step::Done(Some((node.key_at(count - 1), node.val_at(count - 1))));
        }
        last_at(layout, node.subtree_at(count))
    })
}

fn dump_at<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    offset: i64,
    depth: usize,
) -> Step<String> {
    Step::read(layout.block_at(offset), move |bytes| {
        let node = Node::new(layout, bytes);
        let count = node.len();

        let mut line = String::new();
        let _ = write!(line, "{:indent$}@{offset} [", "", indent = depth * 2);
        for i in 0..count {
            if i > 0 {
                line.push(' ');
            }
            let _ = write!(line, "{:?}", node.key_at(i));
        }
        line.push(']');

        if node.is_leaf() {
            return Step::Done(line);
        }

        let subs: SubScratch = (0..=count).map(|i| node.subtree_at(i)).collect();
        dump_children(layout, subs, 0, depth + 1, line)
    })
}

fn dump_children<K: KeyCodec, V: Codec>(
    layout: NodeLayout<K, V>,
    subs: SubScratch,
    slot: usize,
    depth: usize,
    acc: String,
) -> Step<String> {
    if slot == subs.len() {
        return Step::Done(acc);
    }
    dump_at(layout, subs[slot], depth).and_then(move |child| {
        let mut acc = acc;
        acc.push('\n');
        acc.push_str(&child);
        dump_children(layout, subs, slot + 1, depth, acc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemStorage, Session, Storage};

    type Key = [u8; 8];
    type Val = [u8; 8];

    fn key(n: u64) -> Key {
        let mut out = [0u8; 8];
        out.copy_from_slice(format!("{n:08}").as_bytes());
        out
    }

    fn val(n: u64) -> Val {
        let mut out = [0u8; 8];
        out.copy_from_slice(format!("{n:05}000").as_bytes());
        out
    }

    fn session(order: u32) -> Session<Key, Val, MemStorage> {
        Session::create(MemStorage::new(), order).unwrap()
    }

    fn node_block(
        storage: &MemStorage,
        layout: NodeLayout<Key, Val>,
        offset: i64,
    ) -> Vec<u8> {
        storage.read(layout.block_at(offset)).unwrap().to_vec()
    }

    #[test]
    fn create_formats_an_empty_leaf_root() {
        let session = session(3);
        let layout = session.tree().layout();

        let block = node_block(session.storage(), layout, session.root());
        let node = Node::new(layout, &block);

        assert_eq!(node.len(), 0);
        assert!(node.is_leaf());
    }

    #[test]
    fn find_on_empty_tree_returns_none() {
        let mut session = session(3);

        assert_eq!(session.find(key(1)).unwrap(), None);
    }

    #[test]
    fn insert_and_find_single_key() {
        let mut session = session(3);

        session.insert(key(1), val(1)).unwrap();

        assert_eq!(session.find(key(1)).unwrap(), Some(val(1)));
        assert_eq!(session.find(key(2)).unwrap(), None);
    }

    #[test]
    fn insert_and_find_out_of_order_keys() {
        let mut session = session(5);

        for n in [3u64, 1, 4, 1, 5, 9, 2, 6] {
            session.insert(key(n), val(n)).unwrap();
        }

        for n in [1u64, 2, 3, 4, 5, 6, 9] {
            assert_eq!(session.find(key(n)).unwrap(), Some(val(n)), "key {n}");
        }
        assert_eq!(session.find(key(7)).unwrap(), None);
    }

    #[test]
    fn third_insert_splits_the_root() {
        let mut session = session(3);
        let layout = session.tree().layout();
        let old_root = session.root();

        session.insert(key(1), val(1)).unwrap();
        session.insert(key(2), val(2)).unwrap();
        session.insert(key(3), val(3)).unwrap();

        assert_ne!(session.root(), old_root);

        let block = node_block(session.storage(), layout, session.root());
        let root = Node::new(layout, &block);
        assert_eq!(root.len(), 1);
        assert_eq!(root.key_at(0), key(2));
        assert!(!root.is_leaf());
    }

    #[test]
    fn overwrite_rewrites_one_node_and_keeps_the_shape() {
        let mut session = session(3);
        for n in 1..=3u64 {
            session.insert(key(n), val(n)).unwrap();
        }
        let root = session.root();
        let allocated = session.storage().len();

        let commit = crate::storage::run(
            session.storage_mut(),
            BTree::<Key, Val>::open(root, 3).insert(key(2), val(20)),
        )
        .unwrap();

        assert_eq!(commit.new_root, None);
        assert_eq!(commit.writes.len(), 1);

        session.storage_mut().apply(&commit.writes).unwrap();
        assert_eq!(session.storage().len(), allocated);
        assert_eq!(session.find(key(2)).unwrap(), Some(val(20)));
        assert_eq!(session.find(key(1)).unwrap(), Some(val(1)));
    }

    #[test]
    fn split_writes_target_already_allocated_blocks() {
        let mut storage = MemStorage::new();
        let created =
            crate::storage::run(&mut storage, BTree::<Key, Val>::create(3)).unwrap();
        storage.apply(&created.writes).unwrap();
        let mut tree = created.tree;

        for n in 1..=5u64 {
            let commit = crate::storage::run(&mut storage, tree.insert(key(n), val(n))).unwrap();
            for write in &commit.writes {
                assert!(
                    write.offset + write.bytes.len() as i64 <= storage.len() as i64,
                    "write past the allocation watermark"
                );
            }
            storage.apply(&commit.writes).unwrap();
            if let Some(root) = commit.new_root {
                tree = BTree::open(root, tree.order());
            }
        }
    }

    #[test]
    fn many_sequential_inserts_stay_findable() {
        let mut session = session(8);

        for n in 0..500u64 {
            session.insert(key(n), val(n)).unwrap();
        }

        for n in 0..500u64 {
            assert_eq!(session.find(key(n)).unwrap(), Some(val(n)), "key {n}");
        }
    }

    #[test]
    fn many_reverse_inserts_stay_findable() {
        let mut session = session(6);

        for n in (0..200u64).rev() {
            session.insert(key(n), val(n)).unwrap();
        }

        for n in 0..200u64 {
            assert_eq!(session.find(key(n)).unwrap(), Some(val(n)), "key {n}");
        }
    }

    #[test]
    fn values_are_sorted_after_random_inserts() {
        let mut session = session(4);

        for n in [13u64, 7, 29, 1, 19, 5, 23, 3, 17, 11] {
            session.insert(key(n), val(n)).unwrap();
        }

        let values = session.values().unwrap();
        let expected: Vec<Val> = [1u64, 3, 5, 7, 11, 13, 17, 19, 23, 29]
            .iter()
            .map(|&n| val(n))
            .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn for_each_visits_in_key_order() {
        let mut session = session(3);
        for n in [4u64, 2, 6, 1, 3, 5, 7] {
            session.insert(key(n), val(n)).unwrap();
        }

        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        session
            .for_each(move |v| sink.borrow_mut().push(v))
            .unwrap();

        let expected: Vec<Val> = (1..=7u64).map(val).collect();
        assert_eq!(*seen.borrow(), expected);
    }

    #[test]
    fn last_follows_the_right_spine() {
        let mut session = session(3);

        assert_eq!(session.last().unwrap(), None);

        for n in [5u64, 9, 2, 7, 1] {
            session.insert(key(n), val(n)).unwrap();
        }

        assert_eq!(session.last().unwrap(), Some((key(9), val(9))));
    }

    #[test]
    fn find_gt_results_are_ascending_and_bounded() {
        let mut session = session(3);
        for n in 1..=9u64 {
            session.insert(key(n), val(n)).unwrap();
        }

        let hits = session.find_gt(key(4), 3).unwrap();

        assert!(hits.len() <= 3);
        assert!(!hits.is_empty());
        let mut previous = val(4);
        for hit in &hits {
            assert!(*hit > previous);
            previous = *hit;
        }
    }

    #[test]
    fn find_gt_with_zero_budget_returns_nothing() {
        let mut session = session(3);
        session.insert(key(1), val(1)).unwrap();

        assert!(session.find_gt(key(0), 0).unwrap().is_empty());
    }

    #[test]
    fn append_matches_insert_for_ascending_keys() {
        let mut by_insert = session(3);
        let mut by_append = session(3);

        for n in 1..=50u64 {
            by_insert.insert(key(n), val(n)).unwrap();
            by_append.append(key(n), val(n)).unwrap();
        }

        assert_eq!(by_insert.root(), by_append.root());
        assert_eq!(
            by_insert.storage().as_slice(),
            by_append.storage().as_slice()
        );
    }

    #[test]
    fn dump_lists_every_node_once() {
        let mut session = session(3);
        for n in 1..=7u64 {
            session.insert(key(n), val(n)).unwrap();
        }

        let outline = session.dump().unwrap();

        // 7 keys in an order-3 tree: root + 2 interior + 4 leaves
        assert_eq!(outline.lines().count(), 7);
        assert!(outline.starts_with(&format!("@{}", session.root())));
    }
}
