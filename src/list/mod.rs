//! Doubly linked list with stable element handles.
//!
//! [List] hands out [Element] handles on insertion. A handle stays valid
//! until its value is removed or the list is cleared, and can be used to
//! insert next to it, move it or remove it in constant time. Handles
//! are checked against the list they are applied to, a handle from
//! another list, or a stale handle, is silently ignored.
//!
//! ```ignore
//! let list: List<u32> = List::new(true);
//! let e = list.push_back(10);
//! list.push_front(20);
//! list.insert_after(&e, 30);
//! assert_eq!(list.to_string(), "[20,10,30]");
//! ```

mod dlist;

pub use dlist::{Element, List};
