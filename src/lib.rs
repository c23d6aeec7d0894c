//! Package implement a core set of in-memory containers.
//!
//! * [AvlTree], height balanced binary search tree.
//! * [RedBlackTree], color balanced binary search tree.
//! * [BTree], multi-way search tree of configurable order.
//! * [List], doubly linked list with stable [Element] handles.
//!
//! Trees are ordered maps, keys are ordered by a caller supplied
//! [Comparator], and all of them implement the [OrderedMap] contract.
//!
//! **Concurrency**
//!
//! Every container is created either in safe mode or in unsafe mode,
//! refer to [Config]. In safe mode a single latch, [util::Spinlock],
//! serializes writers and lets readers share access, so a container can
//! be shared across threads behind an [Arc][std::sync::Arc]. In unsafe
//! mode caller shall serialize access, an overlapping access is detected
//! and panics.
//!
//! Callbacks passed to iterators, and to `*_with` methods, are invoked
//! while the container's latch is held. They must not call back into
//! the same container.
//!
//! **Serialization**
//!
//! Trees serialize as a JSON object in comparator order, lists as a
//! JSON array in front to back order. Serialization is implemented via
//! [serde], `to_json()`, `from_json()` and `load_json()` are short cuts
//! using [serde_json].

#[macro_use]
mod error;

pub mod comparator;
pub mod config;
pub mod list;
pub mod traits;
pub mod tree;
pub mod util;

pub use crate::comparator::Comparator;
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::list::{Element, List};
pub use crate::traits::{DeepCopy, OrderedMap, Shallow};
pub use crate::tree::{AvlTree, BTree, RedBlackTree};
