// Module implement the binary-search-tree plumbing shared by AVL and
// Red-Black trees.
//
// Nodes are stored in an [Arena] and refer to each other by slot index.
// `left` and `right` are the owning links, `parent` is a back reference
// used for rotations and for successor/predecessor walks, it is never
// followed to reclaim nodes.
//
// Rotations only move structure, balancing metadata (height or color) is
// maintained by the [Balance] implementation that drives them.

use std::{cmp::Ordering, fmt, mem, result};

use crate::{
    comparator::Comparator,
    traits::DeepCopy,
    tree::{Arena, Depth},
    Result,
};

/// Balancing strategy for [BinaryTree][crate::tree::BinaryTree].
///
/// Implemented by [Avl][crate::tree::Avl] and
/// [RedBlack][crate::tree::RedBlack].
pub trait Balance {
    /// Per node balancing metadata.
    type Meta: Clone + fmt::Debug;

    /// Short name used as log target and in stats.
    const KIND: &'static str;

    /// Metadata for a freshly attached leaf.
    fn leaf() -> Self::Meta;

    /// Restore balance after `node` was attached as a new leaf.
    fn after_insert<K, V>(bst: &mut Bst<K, V, Self::Meta>, node: usize);

    /// Unlink `node` from the tree, restore balance and return its entry.
    fn unlink<K, V>(bst: &mut Bst<K, V, Self::Meta>, node: usize) -> (K, V);

    /// Verify the balancing invariants.
    fn validate<K, V>(bst: &Bst<K, V, Self::Meta>) -> Result<()>;

    /// Number of black nodes from root to any nil leaf, if applicable.
    fn blacks<K, V>(_bst: &Bst<K, V, Self::Meta>) -> Option<usize> {
        None
    }
}

#[derive(Clone)]
pub struct Node<K, V, M> {
    pub key: K,
    pub value: V,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub parent: Option<usize>,
    pub meta: M,
}

#[derive(Clone)]
pub struct Bst<K, V, M> {
    cmp: Option<Comparator<K>>,
    pub arena: Arena<Node<K, V, M>>,
    pub root: Option<usize>,
    pub n_count: usize,
}

impl<K, V, M> Bst<K, V, M> {
    pub fn new(cmp: Option<Comparator<K>>) -> Bst<K, V, M> {
        Bst {
            cmp,
            arena: Arena::new(),
            root: None,
            n_count: 0,
        }
    }

    pub fn set_comparator(&mut self, cmp: Comparator<K>) {
        self.cmp = Some(cmp)
    }

    #[inline]
    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        match &self.cmp {
            Some(cmp) => cmp(a, b),
            None => panic!("comparator is missing"),
        }
    }

    #[inline]
    pub fn left(&self, node: usize) -> Option<usize> {
        self.arena[node].left
    }

    #[inline]
    pub fn right(&self, node: usize) -> Option<usize> {
        self.arena[node].right
    }

    #[inline]
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.arena[node].parent
    }

    pub fn lookup(&self, key: &K) -> Option<usize> {
        self.locate(key).ok()
    }

    /// Locate `key`, on a miss return the would-be parent and the side
    /// to attach to, `None` for an empty tree.
    pub fn locate(&self, key: &K) -> result::Result<usize, Option<(usize, Ordering)>> {
        let (mut node, mut at) = (self.root, None);
        while let Some(n) = node {
            let nref = &self.arena[n];
            match self.compare(key, &nref.key) {
                Ordering::Less => node = nref.left,
                Ordering::Greater => node = nref.right,
                Ordering::Equal => return Ok(n),
            };
            at = Some(n);
        }
        Err(at.map(|n| (n, self.compare(key, &self.arena[n].key))))
    }

    /// Attach a new leaf at the position returned by [Bst::locate].
    pub fn attach(&mut self, at: Option<(usize, Ordering)>, key: K, value: V, meta: M) -> usize {
        let node = self.arena.alloc(Node {
            key,
            value,
            left: None,
            right: None,
            parent: at.map(|(p, _)| p),
            meta,
        });
        match at {
            None => self.root = Some(node),
            Some((p, Ordering::Less)) => self.arena[p].left = Some(node),
            Some((p, _)) => self.arena[p].right = Some(node),
        }
        self.n_count += 1;
        node
    }

    pub fn insert<B>(&mut self, key: K, value: V) -> Option<V>
    where
        B: Balance<Meta = M>,
    {
        match self.locate(&key) {
            Ok(n) => Some(mem::replace(&mut self.arena[n].value, value)),
            Err(at) => {
                let node = self.attach(at, key, value, B::leaf());
                B::after_insert(self, node);
                None
            }
        }
    }

    /// Attach past the current maximum, without consulting the comparator.
    /// Caller must supply keys in ascending order.
    pub fn append<B>(&mut self, key: K, value: V)
    where
        B: Balance<Meta = M>,
    {
        let at = self.last().map(|n| (n, Ordering::Greater));
        let node = self.attach(at, key, value, B::leaf());
        B::after_insert(self, node);
    }

    pub fn delete<B>(&mut self, key: &K) -> Option<V>
    where
        B: Balance<Meta = M>,
    {
        let node = self.lookup(key)?;
        let (_, value) = B::unlink(self, node);
        self.n_count -= 1;
        Some(value)
    }

    /// Exchange key and value of two nodes, leaving structure and
    /// metadata in place.
    pub fn swap_entries(&mut self, a: usize, b: usize) {
        let (x, y) = self.arena.pair_mut(a, b);
        mem::swap(&mut x.key, &mut y.key);
        mem::swap(&mut x.value, &mut y.value);
    }

    /// Replace subtree rooted at `old` with subtree rooted at `new`.
    pub fn transplant(&mut self, old: usize, new: Option<usize>) {
        let parent = self.arena[old].parent;
        self.replace_child(parent, old, new);
        if let Some(n) = new {
            self.arena[n].parent = parent;
        }
    }

    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: Option<usize>) {
        match parent {
            None => self.root = new,
            Some(p) if self.arena[p].left == Some(old) => self.arena[p].left = new,
            Some(p) => self.arena[p].right = new,
        }
    }

    //              (i)                       (i)
    //               |                         |
    //              node                     right
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          left     right           node     r-r
    //                    / \            /  \
    //                 r-l  r-r       left  r-l
    //
    pub fn rotate_left(&mut self, node: usize) -> usize {
        let right = match self.arena[node].right {
            Some(right) => right,
            None => panic!("rotate_left(): missing right child, call the programmer"),
        };
        let rl = self.arena[right].left;
        self.arena[node].right = rl;
        if let Some(rl) = rl {
            self.arena[rl].parent = Some(node);
        }
        self.transplant(node, Some(right));
        self.arena[right].left = Some(node);
        self.arena[node].parent = Some(right);
        right
    }

    //              (i)                       (i)
    //               |                         |
    //              node                      left
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //         left     right            l-l      node
    //         / \                                / \
    //      l-l  l-r                            l-r  right
    //
    pub fn rotate_right(&mut self, node: usize) -> usize {
        let left = match self.arena[node].left {
            Some(left) => left,
            None => panic!("rotate_right(): missing left child, call the programmer"),
        };
        let lr = self.arena[left].right;
        self.arena[node].left = lr;
        if let Some(lr) = lr {
            self.arena[lr].parent = Some(node);
        }
        self.transplant(node, Some(left));
        self.arena[left].right = Some(node);
        self.arena[node].parent = Some(left);
        left
    }

    pub fn leftmost(&self, mut node: usize) -> usize {
        while let Some(left) = self.arena[node].left {
            node = left
        }
        node
    }

    pub fn rightmost(&self, mut node: usize) -> usize {
        while let Some(right) = self.arena[node].right {
            node = right
        }
        node
    }

    pub fn first(&self) -> Option<usize> {
        self.root.map(|n| self.leftmost(n))
    }

    pub fn last(&self) -> Option<usize> {
        self.root.map(|n| self.rightmost(n))
    }

    pub fn successor(&self, node: usize) -> Option<usize> {
        if let Some(right) = self.arena[node].right {
            return Some(self.leftmost(right));
        }
        let (mut child, mut parent) = (node, self.arena[node].parent);
        while let Some(p) = parent {
            if self.arena[p].left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.arena[p].parent;
        }
        None
    }

    pub fn predecessor(&self, node: usize) -> Option<usize> {
        if let Some(left) = self.arena[node].left {
            return Some(self.rightmost(left));
        }
        let (mut child, mut parent) = (node, self.arena[node].parent);
        while let Some(p) = parent {
            if self.arena[p].right == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.arena[p].parent;
        }
        None
    }

    /// Greatest node whose key is less than, or equal to if `inclusive`,
    /// `key`.
    pub fn floor(&self, key: &K, inclusive: bool) -> Option<usize> {
        let (mut node, mut found) = (self.root, None);
        while let Some(n) = node {
            let nref = &self.arena[n];
            match self.compare(&nref.key, key) {
                Ordering::Less => {
                    found = Some(n);
                    node = nref.right;
                }
                Ordering::Equal if inclusive => return Some(n),
                _ => node = nref.left,
            }
        }
        found
    }

    /// Least node whose key is greater than, or equal to if `inclusive`,
    /// `key`.
    pub fn ceiling(&self, key: &K, inclusive: bool) -> Option<usize> {
        let (mut node, mut found) = (self.root, None);
        while let Some(n) = node {
            let nref = &self.arena[n];
            match self.compare(&nref.key, key) {
                Ordering::Greater => {
                    found = Some(n);
                    node = nref.left;
                }
                Ordering::Equal if inclusive => return Some(n),
                _ => node = nref.right,
            }
        }
        found
    }

    /// Walk in ascending order starting from `node`, return false if `f`
    /// stopped the walk.
    pub fn walk_asc<F>(&self, mut node: Option<usize>, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        while let Some(n) = node {
            let nref = &self.arena[n];
            if !f(&nref.key, &nref.value) {
                return false;
            }
            node = self.successor(n);
        }
        true
    }

    /// Walk in descending order starting from `node`, return false if `f`
    /// stopped the walk.
    pub fn walk_desc<F>(&self, mut node: Option<usize>, f: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        while let Some(n) = node {
            let nref = &self.arena[n];
            if !f(&nref.key, &nref.value) {
                return false;
            }
            node = self.predecessor(n);
        }
        true
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(usize, usize)> = self.root.map(|n| (n, 1)).into_iter().collect();
        while let Some((n, depth)) = stack.pop() {
            height = usize::max(height, depth);
            let nref = &self.arena[n];
            stack.extend(nref.left.map(|l| (l, depth + 1)));
            stack.extend(nref.right.map(|r| (r, depth + 1)));
        }
        height
    }

    /// Length of every root-to-nil path, counted in nodes.
    pub fn to_depths(&self) -> Depth {
        let mut depths = Depth::default();
        let mut stack: Vec<(Option<usize>, usize)> = vec![(self.root, 0)];
        while let Some((link, length)) = stack.pop() {
            match link {
                Some(n) => {
                    let nref = &self.arena[n];
                    stack.push((nref.left, length + 1));
                    stack.push((nref.right, length + 1));
                }
                None => depths.add_path(length),
            }
        }
        depths
    }

    /// Remove every node and return their entries in ascending order.
    /// Keys in ascending order, matching the order of [Bst::drain].
    pub fn to_key_refs(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.n_count);
        let mut node = self.first();
        while let Some(n) = node {
            keys.push(&self.arena[n].key);
            node = self.successor(n);
        }
        keys
    }

    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut order = Vec::with_capacity(self.n_count);
        let mut node = self.first();
        while let Some(n) = node {
            order.push(n);
            node = self.successor(n);
        }

        let entries = order
            .into_iter()
            .map(|n| {
                let node = self.arena.free(n);
                (node.key, node.value)
            })
            .collect();
        self.clear();
        entries
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.n_count = 0;
    }

    /// Duplicate the tree shape, deep copying every value.
    pub fn deep_copy(&self) -> Bst<K, V, M>
    where
        K: Clone,
        V: DeepCopy,
        M: Clone,
    {
        Bst {
            cmp: self.cmp.clone(),
            arena: self.arena.map_nodes(|n| Node {
                key: n.key.clone(),
                value: n.value.deep_copy(),
                left: n.left,
                right: n.right,
                parent: n.parent,
                meta: n.meta.clone(),
            }),
            root: self.root,
            n_count: self.n_count,
        }
    }

    /// Verify parent links, node count and sort order.
    pub fn validate(&self) -> Result<()> {
        if let Some(root) = self.root {
            if self.arena[root].parent.is_some() {
                err_at!(Fatal, msg: "root node {} has a parent", root)?;
            }
        }

        let mut n_count = 0;
        let mut stack: Vec<usize> = self.root.into_iter().collect();
        while let Some(n) = stack.pop() {
            n_count += 1;
            let nref = &self.arena[n];
            for child in [nref.left, nref.right].iter().flatten() {
                if self.arena[*child].parent != Some(n) {
                    err_at!(Fatal, msg: "broken parent link {} -> {}", child, n)?;
                }
                stack.push(*child);
            }
        }
        if n_count != self.n_count {
            err_at!(Fatal, msg: "n_count {} != {}", n_count, self.n_count)?;
        }
        if self.arena.len() != self.n_count {
            err_at!(Fatal, msg: "arena {} != n_count {}", self.arena.len(), n_count)?;
        }

        let (mut prev, mut node) = (None, self.first());
        while let Some(n) = node {
            if let Some(p) = prev {
                let (pk, nk) = (&self.arena[p].key, &self.arena[n].key);
                if self.compare(pk, nk) != Ordering::Less {
                    err_at!(Fatal, msg: "sort order broken at nodes {}, {}", p, n)?;
                }
            }
            prev = node;
            node = self.successor(n);
        }

        Ok(())
    }

    /// Render tree as box-drawing diagram, right subtree above its
    /// parent and left subtree below.
    pub fn render(&self, f: &mut fmt::Formatter) -> fmt::Result
    where
        K: fmt::Display,
    {
        match self.root {
            Some(root) => self.render_node(root, "", true, f),
            None => Ok(()),
        }
    }

    fn render_node(&self, n: usize, prefix: &str, tail: bool, f: &mut fmt::Formatter) -> fmt::Result
    where
        K: fmt::Display,
    {
        let nref = &self.arena[n];
        if let Some(right) = nref.right {
            let prefix = format!("{}{}", prefix, if tail { "│   " } else { "    " });
            self.render_node(right, &prefix, false, f)?;
        }
        let edge = if tail { "└── " } else { "┌── " };
        writeln!(f, "{}{}{}", prefix, edge, nref.key)?;
        if let Some(left) = nref.left {
            let prefix = format!("{}{}", prefix, if tail { "    " } else { "│   " });
            self.render_node(left, &prefix, true, f)?;
        }
        Ok(())
    }
}
