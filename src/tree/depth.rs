use std::{fmt, result};

/// Shape of a tree, measured along every path from the root to a nil link.
///
/// Path length counts the nodes visited, so an empty tree has a single path
/// of length zero and a binary tree of `n` nodes has `n + 1` paths. B-tree
/// leaves contribute one path per nil child slot.
///
/// Balanced trees bound the gap between the shortest and the longest path:
/// for both AVL and Red-Black trees `longest <= 2 * shortest`, and B-trees
/// keep every path at the same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Depth {
    paths: usize,
    shortest: Option<usize>,
    longest: usize,
    total: usize,
}

impl Depth {
    pub(crate) fn add_path(&mut self, length: usize) {
        self.paths += 1;
        self.total += length;
        self.longest = usize::max(self.longest, length);
        self.shortest = Some(self.shortest.map_or(length, |s| usize::min(s, length)));
    }

    /// Number of root-to-nil paths.
    pub fn to_paths(&self) -> usize {
        self.paths
    }

    pub fn to_shortest(&self) -> usize {
        self.shortest.unwrap_or(0)
    }

    /// Same as the tree height.
    pub fn to_longest(&self) -> usize {
        self.longest
    }

    pub fn to_mean(&self) -> f64 {
        match self.paths {
            0 => 0.0,
            n => (self.total as f64) / (n as f64),
        }
    }

    /// Whether the longest path is within `factor` times the shortest one.
    pub fn is_within(&self, factor: usize) -> bool {
        self.longest <= factor * self.to_shortest()
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(
            f,
            "{{ paths={}, shortest={}, mean={:.2}, longest={} }}",
            self.paths,
            self.to_shortest(),
            self.to_mean(),
            self.longest
        )
    }
}

#[cfg(test)]
#[path = "depth_test.rs"]
mod depth_test;
