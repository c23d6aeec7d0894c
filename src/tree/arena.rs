use std::ops::{Index, IndexMut};

/// Slot storage for tree nodes. Nodes refer to each other by slot index,
/// the arena owns every node and freed slots are recycled.
#[derive(Clone)]
pub struct Arena<N> {
    slots: Vec<Option<N>>,
    free: Vec<usize>,
}

impl<N> Arena<N> {
    pub fn new() -> Arena<N> {
        Arena {
            slots: vec![],
            free: vec![],
        }
    }

    pub fn alloc(&mut self, node: N) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    pub fn free(&mut self, idx: usize) -> N {
        match self.slots.get_mut(idx).and_then(Option::take) {
            Some(node) => {
                self.free.push(idx);
                node
            }
            None => panic!("free on vacant slot {}, call the programmer", idx),
        }
    }

    /// Return mutable reference to two distinct nodes.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> (&mut N, &mut N) {
        assert!(a != b, "pair_mut on same slot {}", a);
        let (x, y) = if a < b {
            let (lo, hi) = self.slots.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        };
        match (x.as_mut(), y.as_mut()) {
            (Some(x), Some(y)) => (x, y),
            _ => panic!("pair_mut on vacant slot {}/{}, call the programmer", a, b),
        }
    }

    /// Build a new arena with identical slot layout, mapping each node.
    pub fn map_nodes<O, F>(&self, mut f: F) -> Arena<O>
    where
        F: FnMut(&N) -> O,
    {
        Arena {
            slots: self.slots.iter().map(|s| s.as_ref().map(&mut f)).collect(),
            free: self.free.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

impl<N> Index<usize> for Arena<N> {
    type Output = N;

    fn index(&self, idx: usize) -> &N {
        match self.slots[idx].as_ref() {
            Some(node) => node,
            None => panic!("dangling slot {}, call the programmer", idx),
        }
    }
}

impl<N> IndexMut<usize> for Arena<N> {
    fn index_mut(&mut self, idx: usize) -> &mut N {
        match self.slots[idx].as_mut() {
            Some(node) => node,
            None => panic!("dangling slot {}, call the programmer", idx),
        }
    }
}
