// Red-Black balancing, as laid out by Cormen et.al. Nil links count as
// black nodes.
//
// * Root node is always black.
// * Red node never has a red child.
// * Every path from root to a nil link has the same number of black
//   nodes.

use crate::{
    tree::bst::{Balance, Bst, Node},
    Result,
};

/// Color of a Red-Black tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Color balanced [Balance] strategy, see
/// [RedBlackTree][crate::tree::RedBlackTree].
pub struct RedBlack;

type RbBst<K, V> = Bst<K, V, Color>;

impl Balance for RedBlack {
    type Meta = Color;

    const KIND: &'static str = "rbtree";

    fn leaf() -> Color {
        Color::Red
    }

    fn after_insert<K, V>(bst: &mut RbBst<K, V>, mut node: usize) {
        while let Some(parent) = bst.parent(node) {
            if color(bst, Some(parent)) == Color::Black {
                break;
            }
            // red parent is never the root.
            let grand = match bst.parent(parent) {
                Some(grand) => grand,
                None => break,
            };

            if bst.left(grand) == Some(parent) {
                let uncle = bst.right(grand);
                if color(bst, uncle) == Color::Red {
                    paint(bst, Some(parent), Color::Black);
                    paint(bst, uncle, Color::Black);
                    paint(bst, Some(grand), Color::Red);
                    node = grand;
                    continue;
                }
                if bst.right(parent) == Some(node) {
                    node = parent;
                    bst.rotate_left(node);
                }
                let parent = bst.parent(node);
                paint(bst, parent, Color::Black);
                paint(bst, Some(grand), Color::Red);
                bst.rotate_right(grand);
            } else {
                let uncle = bst.left(grand);
                if color(bst, uncle) == Color::Red {
                    paint(bst, Some(parent), Color::Black);
                    paint(bst, uncle, Color::Black);
                    paint(bst, Some(grand), Color::Red);
                    node = grand;
                    continue;
                }
                if bst.left(parent) == Some(node) {
                    node = parent;
                    bst.rotate_right(node);
                }
                let parent = bst.parent(node);
                paint(bst, parent, Color::Black);
                paint(bst, Some(grand), Color::Red);
                bst.rotate_left(grand);
            }
        }
        let root = bst.root;
        paint(bst, root, Color::Black);
    }

    fn unlink<K, V>(bst: &mut RbBst<K, V>, mut node: usize) -> (K, V) {
        if let (Some(_), Some(right)) = (bst.left(node), bst.right(node)) {
            let next = bst.leftmost(right);
            bst.swap_entries(node, next);
            node = next;
        }

        let child = bst.left(node).or_else(|| bst.right(node));
        let parent = bst.parent(node);
        let black = color(bst, Some(node)) == Color::Black;
        bst.transplant(node, child);
        let Node { key, value, .. } = bst.arena.free(node);

        if black {
            delete_fixup(bst, child, parent);
        }
        (key, value)
    }

    fn validate<K, V>(bst: &RbBst<K, V>) -> Result<()> {
        if color(bst, bst.root) != Color::Black {
            err_at!(Fatal, msg: "root node must be black")?;
        }
        match bst.root {
            Some(root) => validate_node(bst, root, false).map(|_| ()),
            None => Ok(()),
        }
    }

    fn blacks<K, V>(bst: &RbBst<K, V>) -> Option<usize> {
        let (mut blacks, mut node) = (0, bst.root);
        while let Some(n) = node {
            if bst.arena[n].meta == Color::Black {
                blacks += 1;
            }
            node = bst.left(n);
        }
        Some(blacks)
    }
}

#[inline]
fn color<K, V>(bst: &RbBst<K, V>, node: Option<usize>) -> Color {
    node.map_or(Color::Black, |n| bst.arena[n].meta)
}

#[inline]
fn paint<K, V>(bst: &mut RbBst<K, V>, node: Option<usize>, c: Color) {
    if let Some(n) = node {
        bst.arena[n].meta = c
    }
}

// `node` carries an extra black, it is either the child that replaced
// the unlinked black node, or nil, in which case `parent` locates it.
fn delete_fixup<K, V>(bst: &mut RbBst<K, V>, mut node: Option<usize>, mut parent: Option<usize>) {
    while node != bst.root && color(bst, node) == Color::Black {
        let p = match parent {
            Some(p) => p,
            None => break,
        };

        if node == bst.left(p) {
            let mut sibling = bst.right(p);
            if color(bst, sibling) == Color::Red {
                paint(bst, sibling, Color::Black);
                paint(bst, Some(p), Color::Red);
                bst.rotate_left(p);
                sibling = bst.right(p);
            }
            // sibling of a doubly black node is never nil.
            let s = match sibling {
                Some(s) => s,
                None => panic!("delete_fixup(): nil sibling, call the programmer"),
            };
            let (sl, sr) = (bst.left(s), bst.right(s));
            if color(bst, sl) == Color::Black && color(bst, sr) == Color::Black {
                paint(bst, Some(s), Color::Red);
                node = Some(p);
                parent = bst.parent(p);
            } else {
                let s = if color(bst, sr) == Color::Black {
                    paint(bst, sl, Color::Black);
                    paint(bst, Some(s), Color::Red);
                    bst.rotate_right(s)
                } else {
                    s
                };
                let pc = color(bst, Some(p));
                paint(bst, Some(s), pc);
                paint(bst, Some(p), Color::Black);
                let sr = bst.right(s);
                paint(bst, sr, Color::Black);
                bst.rotate_left(p);
                node = bst.root;
                parent = None;
            }
        } else {
            let mut sibling = bst.left(p);
            if color(bst, sibling) == Color::Red {
                paint(bst, sibling, Color::Black);
                paint(bst, Some(p), Color::Red);
                bst.rotate_right(p);
                sibling = bst.left(p);
            }
            let s = match sibling {
                Some(s) => s,
                None => panic!("delete_fixup(): nil sibling, call the programmer"),
            };
            let (sl, sr) = (bst.left(s), bst.right(s));
            if color(bst, sl) == Color::Black && color(bst, sr) == Color::Black {
                paint(bst, Some(s), Color::Red);
                node = Some(p);
                parent = bst.parent(p);
            } else {
                let s = if color(bst, sl) == Color::Black {
                    paint(bst, sr, Color::Black);
                    paint(bst, Some(s), Color::Red);
                    bst.rotate_left(s)
                } else {
                    s
                };
                let pc = color(bst, Some(p));
                paint(bst, Some(s), pc);
                paint(bst, Some(p), Color::Black);
                let sl = bst.left(s);
                paint(bst, sl, Color::Black);
                bst.rotate_right(p);
                node = bst.root;
                parent = None;
            }
        }
    }
    paint(bst, node, Color::Black);
}

// return the number of black nodes from `node` down to any nil link.
fn validate_node<K, V>(bst: &RbBst<K, V>, node: usize, red_parent: bool) -> Result<usize> {
    let red = bst.arena[node].meta == Color::Red;
    if red && red_parent {
        err_at!(Fatal, msg: "consecutive red nodes at {}", node)?;
    }

    let lb = match bst.left(node) {
        Some(left) => validate_node(bst, left, red)?,
        None => 0,
    };
    let rb = match bst.right(node) {
        Some(right) => validate_node(bst, right, red)?,
        None => 0,
    };
    if lb != rb {
        err_at!(Fatal, msg: "unbalanced blacks at {}, left:{} right:{}", node, lb, rb)?;
    }

    Ok(if red { lb } else { lb + 1 })
}

#[cfg(test)]
#[path = "rb_test.rs"]
mod rb_test;
