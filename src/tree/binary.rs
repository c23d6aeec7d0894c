//! Module `binary` implement the public face of self-balancing binary
//! search trees, parametrized over the [Balance] strategy.
//!
//! Every operation acquires the tree's latch once, writes hold it
//! exclusively for the whole operation, including all rotations.

use log::{debug, info};
use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

use std::{fmt, iter::FromIterator, mem, result};

use crate::{
    comparator::{self, Comparator},
    config::Config,
    traits::{DeepCopy, OrderedMap},
    tree::{
        bst::{Balance, Bst, Node},
        resort_plan, Entries, Stats,
    },
    util::Spinlock,
    Result,
};

/// Ordered map backed by a self-balancing binary search tree. Refer to
/// [AvlTree][crate::tree::AvlTree] and
/// [RedBlackTree][crate::tree::RedBlackTree].
///
/// Keys are ordered by the [Comparator] supplied at construction,
/// `Ord` is never consulted. A tree created with [Default] carries no
/// comparator and panics with "comparator is missing" on first use.
pub struct BinaryTree<K, V, B>
where
    B: Balance,
{
    name: String,
    inner: Spinlock<Bst<K, V, B::Meta>>,
}

impl<K, V, B> BinaryTree<K, V, B>
where
    B: Balance,
{
    /// Create an empty tree ordered by `cmp`. With `safe` as false,
    /// caller shall serialize access to the tree.
    pub fn new(cmp: Comparator<K>, safe: bool) -> BinaryTree<K, V, B> {
        let mut config = Config::default();
        config.set_safe(safe);
        Self::build(Some(cmp), &config)
    }

    pub fn with_config(cmp: Comparator<K>, config: &Config) -> BinaryTree<K, V, B> {
        Self::build(Some(cmp), config)
    }

    /// Create a tree ordered by `cmp` and load it with `entries`.
    pub fn with_entries<I>(cmp: Comparator<K>, entries: I, safe: bool) -> BinaryTree<K, V, B>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = Self::new(cmp, safe);
        {
            let bst = tree.inner.get_mut();
            entries.into_iter().for_each(|(k, v)| {
                bst.insert::<B>(k, v);
            });
        }
        tree
    }

    fn build(cmp: Option<Comparator<K>>, config: &Config) -> BinaryTree<K, V, B> {
        BinaryTree {
            name: config.name.clone(),
            inner: Spinlock::new(Bst::new(cmp), config.safe, config.spin),
        }
    }

    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    pub fn is_safe(&self) -> bool {
        self.inner.is_safe()
    }

    pub fn len(&self) -> usize {
        self.inner.read().n_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes on the longest path from root to a leaf.
    pub fn height(&self) -> usize {
        self.inner.read().height()
    }

    /// Set `key` to `value`, return the older value if `key` was already
    /// present. Existing keys are updated in place, without rebalancing.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert::<B>(key, value)
    }

    /// Set a batch of entries, under a single latch.
    pub fn set_entries<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut bst = self.inner.write();
        for (key, value) in entries {
            bst.insert::<B>(key, value);
        }
    }

    /// Set `key` only if it is not already present, return whether the
    /// entry was added.
    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        self.set_if_absent_with(key, || value)
    }

    /// Same as [set_if_absent][Self::set_if_absent], `f` is evaluated
    /// under the latch only when `key` is absent.
    pub fn set_if_absent_with<F>(&self, key: K, f: F) -> bool
    where
        F: FnOnce() -> V,
    {
        let mut bst = self.inner.write();
        match bst.lookup(&key) {
            Some(_) => false,
            None => {
                bst.insert::<B>(key, f());
                true
            }
        }
    }

    /// Return the value for `key`, setting it to `value` if absent.
    pub fn get_or_set(&self, key: K, value: V) -> V
    where
        V: Clone,
    {
        self.get_or_set_with(key, || value)
    }

    /// Return the value for `key`, if absent `f` is evaluated under the
    /// latch and its result is set and returned.
    pub fn get_or_set_with<F>(&self, key: K, f: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        let mut bst = self.inner.write();
        match bst.lookup(&key) {
            Some(n) => bst.arena[n].value.clone(),
            None => {
                let value = f();
                bst.insert::<B>(key, value.clone());
                value
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Apply `f` on the value for `key`, under the read latch.
    pub fn get_with<F, R>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        let bst = self.inner.read();
        bst.lookup(key).map(|n| f(&bst.arena[n].value))
    }

    /// Alias for [get][Self::get].
    pub fn search(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().lookup(key).is_some()
    }

    /// Remove `key`, return its value if it was present. Removing an
    /// absent key leaves the tree untouched.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.write().delete::<B>(key)
    }

    /// Remove a batch of keys under a single latch, return the number
    /// of entries removed.
    pub fn removes(&self, keys: &[K]) -> usize {
        let mut bst = self.inner.write();
        keys.iter().filter_map(|key| bst.delete::<B>(key)).count()
    }

    pub fn clear(&self) {
        let n = {
            let mut bst = self.inner.write();
            let n = bst.n_count;
            bst.clear();
            n
        };
        debug!(target: B::KIND, "{} cleared {} entries", self.name, n);
    }

    /// Replace all entries with `entries`, under a single latch.
    pub fn replace<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut bst = self.inner.write();
        bst.clear();
        for (key, value) in entries {
            bst.insert::<B>(key, value);
        }
    }

    /// Replace the comparator and re-sort every entry into a rebuilt
    /// tree.
    ///
    /// Entries are ordered under `cmp` before the tree is touched, so a
    /// panicking comparator leaves the tree as it was. Of the entries that
    /// compare equal under `cmp`, the one later in the old order is kept.
    pub fn set_comparator(&self, cmp: Comparator<K>) {
        let n = {
            let mut bst = self.inner.write();
            let plan = resort_plan(&bst.to_key_refs(), &cmp);
            let mut entries: Vec<Option<(K, V)>> = bst.drain().into_iter().map(Some).collect();
            bst.set_comparator(cmp);
            for (pos, replaced) in plan.into_iter() {
                match entries[pos].take() {
                    Some((key, value)) if !replaced => bst.append::<B>(key, value),
                    _ => (),
                }
            }
            bst.n_count
        };
        info!(target: B::KIND, "{} new comparator, re-sorted {} entries", self.name, n);
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.len());
        self.iterate_asc(|k, _| {
            keys.push(k.clone());
            true
        });
        keys
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let mut values = Vec::with_capacity(self.len());
        self.iterate_asc(|_, v| {
            values.push(v.clone());
            true
        });
        values
    }

    /// Snapshot of all entries, in comparator order.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut entries = Vec::with_capacity(self.len());
        self.iterate_asc(|k, v| {
            entries.push((k.clone(), v.clone()));
            true
        });
        entries
    }

    /// Return the minimum entry.
    pub fn left(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let bst = self.inner.read();
        bst.first().map(|n| to_entry(&bst.arena[n]))
    }

    /// Return the maximum entry.
    pub fn right(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let bst = self.inner.read();
        bst.last().map(|n| to_entry(&bst.arena[n]))
    }

    /// Return the greatest entry whose key is less than or equal to
    /// `key`.
    pub fn floor(&self, key: &K) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let bst = self.inner.read();
        bst.floor(key, true).map(|n| to_entry(&bst.arena[n]))
    }

    /// Return the least entry whose key is greater than or equal to
    /// `key`.
    pub fn ceiling(&self, key: &K) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let bst = self.inner.read();
        bst.ceiling(key, true).map(|n| to_entry(&bst.arena[n]))
    }

    /// Alias for [iterate_asc][Self::iterate_asc].
    pub fn iterate<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.iterate_asc(f)
    }

    /// Iterate entries in ascending order until `f` returns false. `f`
    /// is called under the read latch and must not mutate this tree.
    pub fn iterate_asc<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let bst = self.inner.read();
        bst.walk_asc(bst.first(), &mut f);
    }

    /// Iterate entries in descending order until `f` returns false.
    pub fn iterate_desc<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let bst = self.inner.read();
        bst.walk_desc(bst.last(), &mut f);
    }

    /// Iterate in ascending order starting from `key`, include `key`
    /// itself only if `inclusive`. `key` need not be present.
    pub fn iterate_asc_from<F>(&self, key: &K, inclusive: bool, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let bst = self.inner.read();
        bst.walk_asc(bst.ceiling(key, inclusive), &mut f);
    }

    /// Iterate in descending order starting from `key`, include `key`
    /// itself only if `inclusive`. `key` need not be present.
    pub fn iterate_desc_from<F>(&self, key: &K, inclusive: bool, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let bst = self.inner.read();
        bst.walk_desc(bst.floor(key, inclusive), &mut f);
    }

    /// Validate sort order, parent links, entry count and balancing
    /// invariants of the tree.
    pub fn validate(&self) -> Result<()> {
        let bst = self.inner.read();
        bst.validate()?;
        B::validate(&*bst)
    }

    pub fn to_stats(&self) -> Result<Stats> {
        let (safe, spin) = (self.inner.is_safe(), self.inner.is_spin());
        let mut stats = Stats::new(&self.name, B::KIND, safe, spin);
        stats.node_size = mem::size_of::<Node<K, V, B::Meta>>();
        {
            let bst = self.inner.read();
            stats.n_count = bst.n_count;
            stats.height = bst.height();
            stats.blacks = B::blacks(&*bst);
            stats.depths = Some(bst.to_depths());
        }
        stats.spin_stats = self.inner.to_stats()?;
        Ok(stats)
    }

    /// Export entries as JSON object, in comparator order.
    pub fn to_json(&self) -> Result<String>
    where
        K: Serialize,
        V: Serialize,
    {
        err_at!(FailJson, serde_json::to_string(self))
    }

    /// Build a tree ordered by `cmp` from JSON object `text`.
    pub fn from_json(cmp: Comparator<K>, text: &str, safe: bool) -> Result<BinaryTree<K, V, B>>
    where
        K: serde::de::DeserializeOwned,
        V: serde::de::DeserializeOwned,
    {
        let Entries(entries) = err_at!(FailJson, serde_json::from_str::<Entries<K, V>>(text))?;
        Ok(Self::with_entries(cmp, entries, safe))
    }

    /// Load entries from JSON object `text` into this tree, existing
    /// keys are overwritten.
    pub fn load_json(&self, text: &str) -> Result<()>
    where
        K: serde::de::DeserializeOwned,
        V: serde::de::DeserializeOwned,
    {
        let Entries(entries) = err_at!(FailJson, serde_json::from_str::<Entries<K, V>>(text))?;
        let n = entries.len();
        self.set_entries(entries);
        debug!(target: B::KIND, "{} loaded {} entries from json", self.name, n);
        Ok(())
    }
}

fn to_entry<K, V, M>(node: &Node<K, V, M>) -> (K, V)
where
    K: Clone,
    V: Clone,
{
    (node.key.clone(), node.value.clone())
}

impl<K, V, B> Default for BinaryTree<K, V, B>
where
    B: Balance,
{
    fn default() -> BinaryTree<K, V, B> {
        Self::build(None, &Config::default())
    }
}

/// Structural copy, the clone has the same shape and concurrency mode.
impl<K, V, B> Clone for BinaryTree<K, V, B>
where
    K: Clone,
    V: Clone,
    B: Balance,
{
    fn clone(&self) -> BinaryTree<K, V, B> {
        let bst = Bst::clone(&self.inner.read());
        BinaryTree {
            name: self.name.clone(),
            inner: Spinlock::new(bst, self.inner.is_safe(), self.inner.is_spin()),
        }
    }
}

impl<K, V, B> DeepCopy for BinaryTree<K, V, B>
where
    K: Clone,
    V: DeepCopy,
    B: Balance,
{
    fn deep_copy(&self) -> BinaryTree<K, V, B> {
        let bst = self.inner.read().deep_copy();
        debug!(target: B::KIND, "{} deep copied {} entries", self.name, bst.n_count);
        BinaryTree {
            name: self.name.clone(),
            inner: Spinlock::new(bst, self.inner.is_safe(), self.inner.is_spin()),
        }
    }
}

/// Render tree as box-drawing diagram, refer to module documentation.
impl<K, V, B> fmt::Display for BinaryTree<K, V, B>
where
    K: fmt::Display,
    B: Balance,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.read().render(f)
    }
}

impl<K, V, B> Serialize for BinaryTree<K, V, B>
where
    K: Serialize,
    V: Serialize,
    B: Balance,
{
    fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bst = self.inner.read();
        let mut map = serializer.serialize_map(Some(bst.n_count))?;
        let mut node = bst.first();
        while let Some(n) = node {
            map.serialize_entry(&bst.arena[n].key, &bst.arena[n].value)?;
            node = bst.successor(n);
        }
        map.end()
    }
}

/// Deserialize into a safe tree, ordered by the natural order of `K`.
impl<'de, K, V, B> Deserialize<'de> for BinaryTree<K, V, B>
where
    K: 'static + Ord + Deserialize<'de>,
    V: Deserialize<'de>,
    B: Balance,
{
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Entries(entries) = Entries::deserialize(deserializer)?;
        Ok(Self::with_entries(comparator::natural(), entries, true))
    }
}

/// Collect into a safe tree, ordered by the natural order of `K`.
impl<K, V, B> FromIterator<(K, V)> for BinaryTree<K, V, B>
where
    K: 'static + Ord,
    B: Balance,
{
    fn from_iter<I>(iter: I) -> BinaryTree<K, V, B>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self::with_entries(comparator::natural(), iter, true)
    }
}

impl<K, V, B> Extend<(K, V)> for BinaryTree<K, V, B>
where
    B: Balance,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let bst = self.inner.get_mut();
        for (key, value) in iter {
            bst.insert::<B>(key, value);
        }
    }
}

impl<K, V, B> OrderedMap<K, V> for BinaryTree<K, V, B>
where
    B: Balance,
{
    fn len(&self) -> usize {
        BinaryTree::len(self)
    }

    fn set(&self, key: K, value: V) -> Option<V> {
        BinaryTree::set(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        BinaryTree::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        BinaryTree::contains(self, key)
    }

    fn remove(&self, key: &K) -> Option<V> {
        BinaryTree::remove(self, key)
    }

    fn clear(&self) {
        BinaryTree::clear(self)
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        BinaryTree::keys(self)
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        BinaryTree::values(self)
    }

    fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        BinaryTree::entries(self)
    }

    fn iterate_asc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        BinaryTree::iterate_asc(self, f)
    }

    fn iterate_desc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        BinaryTree::iterate_desc(self, f)
    }
}

#[cfg(test)]
#[path = "binary_test.rs"]
mod binary_test;
