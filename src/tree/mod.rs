//! Ordered map containers.
//!
//! * [AvlTree], height balanced binary search tree.
//! * [RedBlackTree], color balanced binary search tree.
//! * [BTree], multi-way search tree of configurable order.
//!
//! All three are ordered by a caller supplied
//! [Comparator][crate::comparator::Comparator], implement the
//! [OrderedMap][crate::traits::OrderedMap] contract, export to JSON as an
//! object in comparator order and guard their nodes with a single
//! latch, refer to [Spinlock][crate::util::Spinlock].

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use std::{cmp::Ordering, fmt, marker::PhantomData, result};

mod arena;
mod avl;
mod binary;
mod bst;
mod btree;
mod depth;
mod rb;
mod stats;

use arena::Arena;

use crate::comparator::Comparator;

pub use avl::Avl;
pub use binary::BinaryTree;
pub use bst::Balance;
pub use btree::BTree;
pub use depth::Depth;
pub use rb::{Color, RedBlack};
pub use stats::Stats;

/// AVL tree, after every mutation the heights of the two subtrees of
/// any node differ by at most one.
pub type AvlTree<K, V> = BinaryTree<K, V, Avl>;

/// Red-Black tree, as described by Cormen et.al.
pub type RedBlackTree<K, V> = BinaryTree<K, V, RedBlack>;

// Entries decoded from a JSON object, in document order.
pub(crate) struct Entries<K, V>(pub Vec<(K, V)>);

impl<'de, K, V> Deserialize<'de> for Entries<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

struct EntriesVisitor<K, V>(PhantomData<(K, V)>);

impl<'de, K, V> Visitor<'de> for EntriesVisitor<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    type Value = Entries<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an object of key, value entries")
    }

    fn visit_map<A>(self, mut access: A) -> result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry()? {
            entries.push(entry);
        }
        Ok(Entries(entries))
    }
}

// Sorted positions of `keys` under `cmp`, each flagged when the key at the
// next sorted position compares equal and replaces it. This is the only
// place a new comparator runs while re-sorting, so a panic here leaves the
// tree untouched.
pub(crate) fn resort_plan<K>(keys: &[&K], cmp: &Comparator<K>) -> Vec<(usize, bool)> {
    let mut positions: Vec<usize> = (0..keys.len()).collect();
    positions.sort_by(|a, b| cmp(keys[*a], keys[*b]));

    let mut plan = Vec::with_capacity(positions.len());
    for (i, pos) in positions.iter().enumerate() {
        let replaced = match positions.get(i + 1) {
            Some(next) => cmp(keys[*pos], keys[*next]) == Ordering::Equal,
            None => false,
        };
        plan.push((*pos, replaced));
    }
    plan
}

