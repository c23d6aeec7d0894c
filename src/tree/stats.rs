use std::{fmt, result};

use crate::{tree::Depth, util::spinlock};

/// Statistic type, for tree containers.
pub struct Stats {
    pub name: String,
    /// One of "avl", "rbtree", "btree".
    pub kind: &'static str,
    pub safe: bool,
    pub spin: bool,
    pub node_size: usize,
    pub n_count: usize,
    pub height: usize,
    pub spin_stats: spinlock::Stats,
    /// Black height, available only for red-black trees.
    pub blacks: Option<usize>,
    pub depths: Option<Depth>,
}

impl Stats {
    pub(crate) fn new(name: &str, kind: &'static str, safe: bool, spin: bool) -> Stats {
        Stats {
            name: name.to_string(),
            kind,
            safe,
            spin,
            node_size: Default::default(),
            n_count: Default::default(),
            height: Default::default(),
            spin_stats: Default::default(),
            blacks: None,
            depths: None,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let none = "none".to_string();
        let b = self.blacks.as_ref().map_or(none.clone(), |x| x.to_string());
        let d = self.depths.as_ref().map_or(none, |x| x.to_string());
        let k = self.kind;
        writeln!(f, "{}.name = {}", k, self.name)?;
        writeln!(f, "{} = {{ safe={}, spin={} }}", k, self.safe, self.spin)?;
        writeln!(
            f,
            "{} = {{ n_count={}, node_size={}, height={}, blacks={} }}",
            k, self.n_count, self.node_size, self.height, b,
        )?;
        writeln!(f, "{}.spin_stats = {}", k, self.spin_stats)?;
        writeln!(f, "{}.depths = {}", k, d)
    }
}
