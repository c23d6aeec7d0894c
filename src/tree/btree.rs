//! Module `btree` implement an in-memory B-tree of configurable order.
//!
//! Nodes own their children, there are no parent links. A node of
//! order `m` holds at most `m-1` entries and, except for root, at least
//! `ceil(m/2)-1` entries. Internal nodes have one more child than their
//! entries and all leaf nodes are at the same depth.
//!
//! Insert descends to a leaf and splits overflowing nodes around their
//! median on the way back up, a split root grows the tree by one level.
//! Remove takes the entry from a leaf, replacing internal entries with
//! their in-order predecessor, and repairs underflow on the way back up
//! by borrowing from a sibling or merging with it. A root left without
//! entries collapses into its only child.

use log::{debug, info};
use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

use std::{cmp::Ordering, fmt, iter::FromIterator, mem, result};

use crate::{
    comparator::{self, Comparator},
    config::{self, Config},
    traits::{DeepCopy, OrderedMap},
    tree::{resort_plan, Depth, Entries, Stats},
    util::Spinlock,
    Result,
};

const KIND: &str = "btree";

struct Node<K, V> {
    entries: Vec<(K, V)>,
    // empty for leaf nodes.
    children: Vec<Node<K, V>>,
}

impl<K, V> Clone for Node<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Node<K, V> {
        Node {
            entries: self.entries.clone(),
            children: self.children.clone(),
        }
    }
}

impl<K, V> Node<K, V> {
    fn new() -> Node<K, V> {
        Node {
            entries: vec![],
            children: vec![],
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    // split children[i] around its median, median moves up into self.
    fn split_child(&mut self, i: usize) {
        let child = &mut self.children[i];
        let mid = child.entries.len() / 2;
        let entries = child.entries.split_off(mid + 1);
        let median = child.entries.remove(mid);
        let children = match child.is_leaf() {
            true => vec![],
            false => child.children.split_off(mid + 1),
        };
        self.entries.insert(i, median);
        self.children.insert(i + 1, Node { entries, children });
    }

    // restore occupancy of children[i] after a removal underneath it.
    fn rebalance_child(&mut self, i: usize, min: usize) {
        if self.children[i].entries.len() >= min {
            return;
        }

        if i > 0 && self.children[i - 1].entries.len() > min {
            // borrow from left sibling, rotating through the separator.
            let (lo, hi) = self.children.split_at_mut(i);
            let (left, child) = (&mut lo[i - 1], &mut hi[0]);
            if let Some(entry) = left.entries.pop() {
                let sep = mem::replace(&mut self.entries[i - 1], entry);
                child.entries.insert(0, sep);
            }
            if let Some(grand) = left.children.pop() {
                child.children.insert(0, grand);
            }
        } else if i + 1 < self.children.len() && self.children[i + 1].entries.len() > min {
            // borrow from right sibling, rotating through the separator.
            let (lo, hi) = self.children.split_at_mut(i + 1);
            let (child, right) = (&mut lo[i], &mut hi[0]);
            let entry = right.entries.remove(0);
            let sep = mem::replace(&mut self.entries[i], entry);
            child.entries.push(sep);
            if !right.is_leaf() {
                child.children.push(right.children.remove(0));
            }
        } else {
            // merge with a sibling, pulling down the separator.
            let j = if i > 0 { i - 1 } else { i };
            let right = self.children.remove(j + 1);
            let sep = self.entries.remove(j);
            let left = &mut self.children[j];
            left.entries.push(sep);
            left.entries.extend(right.entries);
            left.children.extend(right.children);
        }
    }

    fn to_keys<'a>(&'a self, out: &mut Vec<&'a K>) {
        for (i, (key, _)) in self.entries.iter().enumerate() {
            if let Some(child) = self.children.get(i) {
                child.to_keys(out);
            }
            out.push(key);
        }
        if let Some(child) = self.children.get(self.entries.len()) {
            child.to_keys(out);
        }
    }

    fn key_refs<'a>(&'a self, out: &mut Vec<&'a K>) {
        let mut children = self.children.iter();
        for (key, _) in self.entries.iter() {
            if let Some(child) = children.next() {
                child.key_refs(out);
            }
            out.push(key);
        }
        if let Some(child) = children.next() {
            child.key_refs(out);
        }
    }

    fn into_entries(self, out: &mut Vec<(K, V)>) {
        let mut children = self.children.into_iter();
        for entry in self.entries.into_iter() {
            if let Some(child) = children.next() {
                child.into_entries(out);
            }
            out.push(entry);
        }
        if let Some(child) = children.next() {
            child.into_entries(out);
        }
    }

    fn deep_copy(&self) -> Node<K, V>
    where
        K: Clone,
        V: DeepCopy,
    {
        Node {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.deep_copy()))
                .collect(),
            children: self.children.iter().map(|c| c.deep_copy()).collect(),
        }
    }

    fn first(&self) -> Option<&(K, V)> {
        match self.children.first() {
            Some(child) => child.first(),
            None => self.entries.first(),
        }
    }

    fn last(&self) -> Option<&(K, V)> {
        match self.children.last() {
            Some(child) => child.last(),
            None => self.entries.last(),
        }
    }

    fn walk_asc<F>(&self, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        if let Some(child) = self.children.first() {
            if !child.walk_asc(f) {
                return false;
            }
        }
        self.walk_tail_asc(0, f)
    }

    // walk entries[i..], each followed by its right child.
    fn walk_tail_asc<F>(&self, i: usize, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        for j in i..self.entries.len() {
            let (key, value) = &self.entries[j];
            if !f(key, value) {
                return false;
            }
            if let Some(child) = self.children.get(j + 1) {
                if !child.walk_asc(f) {
                    return false;
                }
            }
        }
        true
    }

    fn walk_desc<F>(&self, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        if let Some(child) = self.children.last() {
            if !child.walk_desc(f) {
                return false;
            }
        }
        self.walk_head_desc(self.entries.len(), f)
    }

    // walk entries[..n] in reverse, each followed by its left child.
    fn walk_head_desc<F>(&self, n: usize, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        for j in (0..n).rev() {
            let (key, value) = &self.entries[j];
            if !f(key, value) {
                return false;
            }
            if let Some(child) = self.children.get(j) {
                if !child.walk_desc(f) {
                    return false;
                }
            }
        }
        true
    }

    fn walk_asc_from<F>(&self, cmp: &Comparator<K>, key: &K, incl: bool, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        match search(cmp, &self.entries, key) {
            Ok(i) if incl => self.walk_tail_asc(i, f),
            Ok(i) => {
                if let Some(child) = self.children.get(i + 1) {
                    if !child.walk_asc(f) {
                        return false;
                    }
                }
                self.walk_tail_asc(i + 1, f)
            }
            Err(i) => {
                if let Some(child) = self.children.get(i) {
                    if !child.walk_asc_from(cmp, key, incl, f) {
                        return false;
                    }
                }
                self.walk_tail_asc(i, f)
            }
        }
    }

    fn walk_desc_from<F>(&self, cmp: &Comparator<K>, key: &K, incl: bool, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        match search(cmp, &self.entries, key) {
            Ok(i) if incl => self.walk_head_desc(i + 1, f),
            Ok(i) => {
                if let Some(child) = self.children.get(i) {
                    if !child.walk_desc(f) {
                        return false;
                    }
                }
                self.walk_head_desc(i, f)
            }
            Err(i) => {
                if let Some(child) = self.children.get(i) {
                    if !child.walk_desc_from(cmp, key, incl, f) {
                        return false;
                    }
                }
                self.walk_head_desc(i, f)
            }
        }
    }

    fn render(&self, level: usize, f: &mut fmt::Formatter) -> fmt::Result
    where
        K: fmt::Display,
    {
        for i in 0..=self.entries.len() {
            if let Some(child) = self.children.get(i) {
                child.render(level + 1, f)?;
            }
            if let Some((key, _)) = self.entries.get(i) {
                writeln!(f, "{}{}", "    ".repeat(level), key)?;
            }
        }
        Ok(())
    }
}

#[inline]
fn search<K, V>(cmp: &Comparator<K>, entries: &[(K, V)], key: &K) -> result::Result<usize, usize> {
    entries.binary_search_by(|(k, _)| cmp(k, key))
}

fn insert_node<K, V>(cmp: &Comparator<K>, order: usize, node: &mut Node<K, V>, key: K, value: V) -> Option<V> {
    match search(cmp, &node.entries, &key) {
        Ok(i) => Some(mem::replace(&mut node.entries[i].1, value)),
        Err(i) if node.is_leaf() => {
            node.entries.insert(i, (key, value));
            None
        }
        Err(i) => {
            let old = insert_node(cmp, order, &mut node.children[i], key, value);
            if node.children[i].entries.len() >= order {
                node.split_child(i);
            }
            old
        }
    }
}

// Push past the maximum entry, splitting full nodes on the way back up.
fn append_node<K, V>(order: usize, node: &mut Node<K, V>, key: K, value: V) {
    if node.is_leaf() {
        node.entries.push((key, value));
        return;
    }
    let i = node.children.len() - 1;
    append_node(order, &mut node.children[i], key, value);
    if node.children[i].entries.len() >= order {
        node.split_child(i);
    }
}

fn remove_node<K, V>(cmp: &Comparator<K>, min: usize, node: &mut Node<K, V>, key: &K) -> Option<(K, V)> {
    match search(cmp, &node.entries, key) {
        Ok(i) if node.is_leaf() => Some(node.entries.remove(i)),
        Ok(i) => {
            let pred = remove_max(min, &mut node.children[i])?;
            let entry = mem::replace(&mut node.entries[i], pred);
            node.rebalance_child(i, min);
            Some(entry)
        }
        Err(_) if node.is_leaf() => None,
        Err(i) => {
            let entry = remove_node(cmp, min, &mut node.children[i], key)?;
            node.rebalance_child(i, min);
            Some(entry)
        }
    }
}

fn remove_max<K, V>(min: usize, node: &mut Node<K, V>) -> Option<(K, V)> {
    match node.children.len() {
        0 => node.entries.pop(),
        n => {
            let entry = remove_max(min, &mut node.children[n - 1])?;
            node.rebalance_child(n - 1, min);
            Some(entry)
        }
    }
}

struct Inner<K, V> {
    cmp: Option<Comparator<K>>,
    order: usize,
    root: Node<K, V>,
    n_count: usize,
}

impl<K, V> Clone for Inner<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Inner<K, V> {
        Inner {
            cmp: self.cmp.clone(),
            order: self.order,
            root: self.root.clone(),
            n_count: self.n_count,
        }
    }
}

impl<K, V> Inner<K, V> {
    fn to_comparator(&self) -> Comparator<K> {
        match &self.cmp {
            Some(cmp) => cmp.clone(),
            None => panic!("comparator is missing"),
        }
    }

    #[inline]
    fn min_entries(&self) -> usize {
        (self.order + 1) / 2 - 1
    }

    fn lookup(&self, key: &K) -> Option<&V> {
        let cmp = self.to_comparator();
        let mut node = &self.root;
        loop {
            match search(&cmp, &node.entries, key) {
                Ok(i) => break Some(&node.entries[i].1),
                Err(i) => node = node.children.get(i)?,
            }
        }
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        let cmp = self.to_comparator();
        let old = insert_node(&cmp, self.order, &mut self.root, key, value);
        if self.root.entries.len() >= self.order {
            let root = mem::replace(&mut self.root, Node::new());
            self.root.children.push(root);
            self.root.split_child(0);
        }
        if old.is_none() {
            self.n_count += 1;
        }
        old
    }

    // keys must arrive in ascending order, the comparator is not consulted.
    fn append(&mut self, key: K, value: V) {
        append_node(self.order, &mut self.root, key, value);
        if self.root.entries.len() >= self.order {
            let root = mem::replace(&mut self.root, Node::new());
            self.root.children.push(root);
            self.root.split_child(0);
        }
        self.n_count += 1;
    }

    fn delete(&mut self, key: &K) -> Option<V> {
        let cmp = self.to_comparator();
        let min = self.min_entries();
        let (_, value) = remove_node(&cmp, min, &mut self.root, key)?;
        if self.root.entries.is_empty() && !self.root.is_leaf() {
            self.root = self.root.children.remove(0);
        }
        self.n_count -= 1;
        Some(value)
    }

    fn drain(&mut self) -> Vec<(K, V)> {
        let mut entries = Vec::with_capacity(self.n_count);
        mem::replace(&mut self.root, Node::new()).into_entries(&mut entries);
        self.n_count = 0;
        entries
    }

    fn clear(&mut self) {
        self.root = Node::new();
        self.n_count = 0;
    }

    fn height(&self) -> usize {
        if self.n_count == 0 {
            return 0;
        }
        let (mut height, mut node) = (1, &self.root);
        while let Some(child) = node.children.first() {
            height += 1;
            node = child;
        }
        height
    }

    fn to_depths(&self) -> Depth {
        let mut depths = Depth::default();
        if self.n_count == 0 {
            depths.add_path(0);
            return depths;
        }
        let mut stack = vec![(&self.root, 1)];
        while let Some((node, length)) = stack.pop() {
            match node.is_leaf() {
                true => (0..=node.entries.len()).for_each(|_| depths.add_path(length)),
                false => stack.extend(node.children.iter().map(|c| (c, length + 1))),
            }
        }
        depths
    }

    fn validate(&self) -> Result<()> {
        let cmp = self.to_comparator();
        let (min, max) = (self.min_entries(), self.order - 1);

        let mut n_count = 0;
        let mut leaf_depth: Option<usize> = None;
        let mut stack = vec![(&self.root, 1, true)];
        while let Some((node, depth, is_root)) = stack.pop() {
            n_count += node.entries.len();
            let n = node.entries.len();
            if n > max || (!is_root && n < min) {
                err_at!(Fatal, msg: "node occupancy {} not in [{}, {}]", n, min, max)?;
            }
            if node.is_leaf() {
                match leaf_depth {
                    Some(d) if d != depth => {
                        err_at!(Fatal, msg: "leaf depth {} != {}", depth, d)?;
                    }
                    _ => leaf_depth = Some(depth),
                }
            } else if node.children.len() != n + 1 {
                err_at!(Fatal, msg: "{} children for {} entries", node.children.len(), n)?;
            }
            stack.extend(node.children.iter().map(|c| (c, depth + 1, false)));
        }
        if n_count != self.n_count {
            err_at!(Fatal, msg: "n_count {} != {}", n_count, self.n_count)?;
        }

        let mut keys = Vec::with_capacity(self.n_count);
        self.root.to_keys(&mut keys);
        for (i, pair) in keys.windows(2).enumerate() {
            if cmp(pair[0], pair[1]) != Ordering::Less {
                err_at!(Fatal, msg: "sort order broken at entry {}", i)?;
            }
        }

        Ok(())
    }
}

/// Ordered map backed by a B-tree of configurable order.
///
/// Keys are ordered by the [Comparator] supplied at construction. Order
/// is the maximum number of children per node, it must be at least 3.
pub struct BTree<K, V> {
    name: String,
    inner: Spinlock<Inner<K, V>>,
}

impl<K, V> BTree<K, V> {
    /// Create an empty B-tree of `order`, ordered by `cmp`.
    ///
    /// Panics if `order` is less than 3.
    pub fn new(order: usize, cmp: Comparator<K>, safe: bool) -> BTree<K, V> {
        let mut config = Config::default();
        config.set_safe(safe).set_order(order);
        Self::build(Some(cmp), &config)
    }

    /// Create an empty B-tree, order and concurrency mode are picked
    /// from `config`.
    pub fn with_config(cmp: Comparator<K>, config: &Config) -> BTree<K, V> {
        Self::build(Some(cmp), config)
    }

    /// Create a B-tree of `order`, ordered by `cmp`, and load it with
    /// `entries`.
    pub fn with_entries<I>(order: usize, cmp: Comparator<K>, entries: I, safe: bool) -> BTree<K, V>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = Self::new(order, cmp, safe);
        {
            let inner = tree.inner.get_mut();
            entries.into_iter().for_each(|(k, v)| {
                inner.insert(k, v);
            });
        }
        tree
    }

    fn build(cmp: Option<Comparator<K>>, config: &Config) -> BTree<K, V> {
        if config.order < config::MIN_ORDER {
            panic!("invalid b-tree order {}", config.order);
        }
        let inner = Inner {
            cmp,
            order: config.order,
            root: Node::new(),
            n_count: 0,
        };
        BTree {
            name: config.name.clone(),
            inner: Spinlock::new(inner, config.safe, config.spin),
        }
    }

    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    pub fn to_order(&self) -> usize {
        self.inner.read().order
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

    /// Number of levels in the tree, zero for an empty tree.
    pub fn height(&self) -> usize {
        self.inner.read().height()
    }

    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    pub fn set_entries<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut inner = self.inner.write();
        for (key, value) in entries {
            inner.insert(key, value);
        }
    }

    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        self.set_if_absent_with(key, || value)
    }

    pub fn set_if_absent_with<F>(&self, key: K, f: F) -> bool
    where
        F: FnOnce() -> V,
    {
        let mut inner = self.inner.write();
        match inner.lookup(&key) {
            Some(_) => false,
            None => {
                inner.insert(key, f());
                true
            }
        }
    }

    pub fn get_or_set(&self, key: K, value: V) -> V
    where
        V: Clone,
    {
        self.get_or_set_with(key, || value)
    }

    pub fn get_or_set_with<F>(&self, key: K, f: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        let mut inner = self.inner.write();
        if let Some(value) = inner.lookup(&key) {
            return value.clone();
        }
        let value = f();
        inner.insert(key, value.clone());
        value
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().lookup(key).cloned()
    }

    pub fn get_with<F, R>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        self.inner.read().lookup(key).map(f)
    }

    pub fn search(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().lookup(key).is_some()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.write().delete(key)
    }

    pub fn removes(&self, keys: &[K]) -> usize {
        let mut inner = self.inner.write();
        keys.iter().filter_map(|key| inner.delete(key)).count()
    }

    pub fn clear(&self) {
        let n = {
            let mut inner = self.inner.write();
            let n = inner.n_count;
            inner.clear();
            n
        };
        debug!(target: KIND, "{} cleared {} entries", self.name, n);
    }

    pub fn replace<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut inner = self.inner.write();
        inner.clear();
        for (key, value) in entries {
            inner.insert(key, value);
        }
    }

    /// Replace the comparator and rebuild the tree under the new order.
    /// A panicking comparator leaves the tree as it was. Of the entries that
    /// compare equal under `cmp`, the one later in the old order is kept.
    pub fn set_comparator(&self, cmp: Comparator<K>) {
        let n = {
            let mut inner = self.inner.write();
            let plan = {
                let mut keys = Vec::with_capacity(inner.n_count);
                inner.root.key_refs(&mut keys);
                resort_plan(&keys, &cmp)
            };
            let mut entries: Vec<Option<(K, V)>> = inner.drain().into_iter().map(Some).collect();
            inner.cmp = Some(cmp);
            for (pos, replaced) in plan.into_iter() {
                match entries[pos].take() {
                    Some((key, value)) if !replaced => inner.append(key, value),
                    _ => (),
                }
            }
            inner.n_count
        };
        info!(target: KIND, "{} new comparator, re-sorted {} entries", self.name, n);
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
        self.inner.read().root.first().cloned()
    }

    /// Return the maximum entry.
    pub fn right(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().root.last().cloned()
    }

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
        self.inner.read().root.walk_asc(&mut f);
    }

    pub fn iterate_desc<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.inner.read().root.walk_desc(&mut f);
    }

    /// Iterate in ascending order starting from `key`, include `key`
    /// itself only if `inclusive`.
    pub fn iterate_asc_from<F>(&self, key: &K, inclusive: bool, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let inner = self.inner.read();
        let cmp = inner.to_comparator();
        inner.root.walk_asc_from(&cmp, key, inclusive, &mut f);
    }

    /// Iterate in descending order starting from `key`, include `key`
    /// itself only if `inclusive`.
    pub fn iterate_desc_from<F>(&self, key: &K, inclusive: bool, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let inner = self.inner.read();
        let cmp = inner.to_comparator();
        inner.root.walk_desc_from(&cmp, key, inclusive, &mut f);
    }

    /// Validate leaf depth, node occupancy, sort order and entry count.
    pub fn validate(&self) -> Result<()> {
        self.inner.read().validate()
    }

    pub fn to_stats(&self) -> Result<Stats> {
        let (safe, spin) = (self.inner.is_safe(), self.inner.is_spin());
        let mut stats = Stats::new(&self.name, KIND, safe, spin);
        stats.node_size = mem::size_of::<Node<K, V>>();
        {
            let inner = self.inner.read();
            stats.n_count = inner.n_count;
            stats.height = inner.height();
            stats.depths = Some(inner.to_depths());
        }
        stats.spin_stats = self.inner.to_stats()?;
        Ok(stats)
    }

    pub fn to_json(&self) -> Result<String>
    where
        K: Serialize,
        V: Serialize,
    {
        err_at!(FailJson, serde_json::to_string(self))
    }

    pub fn from_json(order: usize, cmp: Comparator<K>, text: &str, safe: bool) -> Result<BTree<K, V>>
    where
        K: serde::de::DeserializeOwned,
        V: serde::de::DeserializeOwned,
    {
        let Entries(entries) = err_at!(FailJson, serde_json::from_str::<Entries<K, V>>(text))?;
        Ok(Self::with_entries(order, cmp, entries, safe))
    }

    pub fn load_json(&self, text: &str) -> Result<()>
    where
        K: serde::de::DeserializeOwned,
        V: serde::de::DeserializeOwned,
    {
        let Entries(entries) = err_at!(FailJson, serde_json::from_str::<Entries<K, V>>(text))?;
        let n = entries.len();
        self.set_entries(entries);
        debug!(target: KIND, "{} loaded {} entries from json", self.name, n);
        Ok(())
    }
}

impl<K, V> Default for BTree<K, V> {
    fn default() -> BTree<K, V> {
        Self::build(None, &Config::default())
    }
}

impl<K, V> Clone for BTree<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> BTree<K, V> {
        let inner = Inner::clone(&self.inner.read());
        BTree {
            name: self.name.clone(),
            inner: Spinlock::new(inner, self.inner.is_safe(), self.inner.is_spin()),
        }
    }
}

impl<K, V> DeepCopy for BTree<K, V>
where
    K: Clone,
    V: DeepCopy,
{
    fn deep_copy(&self) -> BTree<K, V> {
        let inner = {
            let inner = self.inner.read();
            Inner {
                cmp: inner.cmp.clone(),
                order: inner.order,
                root: inner.root.deep_copy(),
                n_count: inner.n_count,
            }
        };
        debug!(target: KIND, "{} deep copied {} entries", self.name, inner.n_count);
        BTree {
            name: self.name.clone(),
            inner: Spinlock::new(inner, self.inner.is_safe(), self.inner.is_spin()),
        }
    }
}

/// Render every key on its own line in ascending order, indented by its
/// level in the tree.
impl<K, V> fmt::Display for BTree<K, V>
where
    K: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.read();
        match inner.n_count {
            0 => Ok(()),
            _ => inner.root.render(0, f),
        }
    }
}

impl<K, V> Serialize for BTree<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let inner = self.inner.read();
        let mut map = serializer.serialize_map(Some(inner.n_count))?;
        let mut res = Ok(());
        inner.root.walk_asc(&mut |key, value| {
            res = map.serialize_entry(key, value);
            res.is_ok()
        });
        res?;
        map.end()
    }
}

/// Deserialize into a safe B-tree of default order, ordered by the
/// natural order of `K`.
impl<'de, K, V> Deserialize<'de> for BTree<K, V>
where
    K: 'static + Ord + Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Entries(entries) = Entries::deserialize(deserializer)?;
        Ok(Self::with_entries(config::ORDER, comparator::natural(), entries, true))
    }
}

impl<K, V> FromIterator<(K, V)> for BTree<K, V>
where
    K: 'static + Ord,
{
    fn from_iter<I>(iter: I) -> BTree<K, V>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self::with_entries(config::ORDER, comparator::natural(), iter, true)
    }
}

impl<K, V> Extend<(K, V)> for BTree<K, V> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let inner = self.inner.get_mut();
        for (key, value) in iter {
            inner.insert(key, value);
        }
    }
}

impl<K, V> OrderedMap<K, V> for BTree<K, V> {
    fn len(&self) -> usize {
        BTree::len(self)
    }

    fn set(&self, key: K, value: V) -> Option<V> {
        BTree::set(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        BTree::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        BTree::contains(self, key)
    }

    fn remove(&self, key: &K) -> Option<V> {
        BTree::remove(self, key)
    }

    fn clear(&self) {
        BTree::clear(self)
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        BTree::keys(self)
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        BTree::values(self)
    }

    fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        BTree::entries(self)
    }

    fn iterate_asc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        BTree::iterate_asc(self, f)
    }

    fn iterate_desc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        BTree::iterate_desc(self, f)
    }
}

#[cfg(test)]
#[path = "btree_test.rs"]
mod btree_test;
