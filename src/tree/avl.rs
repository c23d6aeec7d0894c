// AVL balancing, every node carries the height of its subtree and
// after every mutation the heights of the left and right subtree of
// any node differ by at most one.

use crate::{
    tree::bst::{Balance, Bst, Node},
    Result,
};

/// Height balanced [Balance] strategy, see [AvlTree][crate::tree::AvlTree].
pub struct Avl;

type AvlBst<K, V> = Bst<K, V, usize>;

impl Balance for Avl {
    type Meta = usize;

    const KIND: &'static str = "avl";

    fn leaf() -> usize {
        1
    }

    fn after_insert<K, V>(bst: &mut AvlBst<K, V>, node: usize) {
        let mut parent = bst.parent(node);
        while let Some(p) = parent {
            let changed = fix_height(bst, p);
            if balance_factor(bst, p).abs() > 1 {
                // single rebalance restores the height prior to insert.
                rebalance(bst, p);
                break;
            } else if !changed {
                break;
            }
            parent = bst.parent(p);
        }
    }

    fn unlink<K, V>(bst: &mut AvlBst<K, V>, mut node: usize) -> (K, V) {
        if let (Some(_), Some(right)) = (bst.left(node), bst.right(node)) {
            let next = bst.leftmost(right);
            bst.swap_entries(node, next);
            node = next;
        }

        let child = bst.left(node).or_else(|| bst.right(node));
        let mut parent = bst.parent(node);
        bst.transplant(node, child);
        let Node { key, value, .. } = bst.arena.free(node);

        while let Some(p) = parent {
            fix_height(bst, p);
            let top = rebalance(bst, p);
            parent = bst.parent(top);
        }

        (key, value)
    }

    fn validate<K, V>(bst: &AvlBst<K, V>) -> Result<()> {
        match bst.root {
            Some(root) => validate_node(bst, root).map(|_| ()),
            None => Ok(()),
        }
    }
}

#[inline]
fn height<K, V>(bst: &AvlBst<K, V>, node: Option<usize>) -> usize {
    node.map_or(0, |n| bst.arena[n].meta)
}

#[inline]
fn balance_factor<K, V>(bst: &AvlBst<K, V>, node: usize) -> isize {
    let lh = height(bst, bst.left(node)) as isize;
    let rh = height(bst, bst.right(node)) as isize;
    lh - rh
}

// recompute height from children, return whether it changed.
fn fix_height<K, V>(bst: &mut AvlBst<K, V>, node: usize) -> bool {
    let lh = height(bst, bst.left(node));
    let rh = height(bst, bst.right(node));
    let h = 1 + usize::max(lh, rh);
    let changed = bst.arena[node].meta != h;
    bst.arena[node].meta = h;
    changed
}

// rebalance subtree rooted at `node`, return the new subtree root.
fn rebalance<K, V>(bst: &mut AvlBst<K, V>, node: usize) -> usize {
    let bf = balance_factor(bst, node);
    if bf > 1 {
        // left-right case, straighten the left child first.
        if let Some(left) = bst.left(node).filter(|l| balance_factor(bst, *l) < 0) {
            let top = bst.rotate_left(left);
            fix_height(bst, left);
            fix_height(bst, top);
        }
        let top = bst.rotate_right(node);
        fix_height(bst, node);
        fix_height(bst, top);
        top
    } else if bf < -1 {
        // right-left case, straighten the right child first.
        if let Some(right) = bst.right(node).filter(|r| balance_factor(bst, *r) > 0) {
            let top = bst.rotate_right(right);
            fix_height(bst, right);
            fix_height(bst, top);
        }
        let top = bst.rotate_left(node);
        fix_height(bst, node);
        fix_height(bst, top);
        top
    } else {
        node
    }
}

fn validate_node<K, V>(bst: &AvlBst<K, V>, node: usize) -> Result<usize> {
    let lh = match bst.left(node) {
        Some(left) => validate_node(bst, left)?,
        None => 0,
    };
    let rh = match bst.right(node) {
        Some(right) => validate_node(bst, right)?,
        None => 0,
    };

    let h = 1 + usize::max(lh, rh);
    if bst.arena[node].meta != h {
        err_at!(Fatal, msg: "node {} height {} != {}", node, bst.arena[node].meta, h)?;
    }
    if (lh as isize - rh as isize).abs() > 1 {
        err_at!(Fatal, msg: "node {} unbalanced, left:{} right:{}", node, lh, rh)?;
    }
    Ok(h)
}

#[cfg(test)]
#[path = "avl_test.rs"]
mod avl_test;
