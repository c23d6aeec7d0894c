//! Traits shared by containers in this package.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    hash::Hash,
    rc::Rc,
    sync::Arc,
};

/// Map-like contract implemented by every ordered container in this
/// package, [AvlTree][crate::tree::AvlTree],
/// [RedBlackTree][crate::tree::RedBlackTree] and
/// [BTree][crate::tree::BTree].
///
/// All methods take `&self`, containers serialize access internally
/// using their latch.
pub trait OrderedMap<K, V> {
    /// Return number of entries in the container.
    fn len(&self) -> usize;

    /// Return whether container is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set `key`, `value`, return the older value if `key` was already
    /// present.
    fn set(&self, key: K, value: V) -> Option<V>;

    /// Get a copy of value for `key`.
    fn get(&self, key: &K) -> Option<V>
    where
        V: Clone;

    fn contains(&self, key: &K) -> bool;

    /// Remove `key` from the container, return its value if present.
    fn remove(&self, key: &K) -> Option<V>;

    fn clear(&self);

    /// Return all keys in comparator order.
    fn keys(&self) -> Vec<K>
    where
        K: Clone;

    /// Return all values in comparator order of their keys.
    fn values(&self) -> Vec<V>
    where
        V: Clone;

    /// Return a snapshot of all entries in comparator order.
    fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone;

    /// Iterate in ascending order, stop when `f` returns false.
    fn iterate_asc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool;

    /// Iterate in descending order, stop when `f` returns false.
    fn iterate_desc<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool;
}

/// Value level deep-copy capability, invoked by containers'
/// `deep_copy()` for every stored value.
///
/// Implemented for scalars, strings, standard collections and smart
/// pointers. Note that for [Arc] and [Rc] a new allocation is made, the
/// copy does not share the pointee. Types that cannot be deep copied
/// can be wrapped in [Shallow], which falls back to [Clone].
pub trait DeepCopy {
    fn deep_copy(&self) -> Self;
}

/// Fallback wrapper, deep-copy is plain [Clone]. For reference counted
/// values this means the copy still shares the pointee.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Shallow<T>(pub T);

impl<T> DeepCopy for Shallow<T>
where
    T: Clone,
{
    fn deep_copy(&self) -> Self {
        Shallow(self.0.clone())
    }
}

macro_rules! impl_deep_copy_by_clone {
    ($($t:ty),*) => {
        $(
            impl DeepCopy for $t {
                fn deep_copy(&self) -> Self {
                    self.clone()
                }
            }
        )*
    };
}

impl_deep_copy_by_clone![
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128,
    isize, f32, f64, String, &'static str
];

impl<T> DeepCopy for Option<T>
where
    T: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        self.as_ref().map(DeepCopy::deep_copy)
    }
}

impl<T> DeepCopy for Box<T>
where
    T: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        Box::new(self.as_ref().deep_copy())
    }
}

impl<T> DeepCopy for Arc<T>
where
    T: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        Arc::new(self.as_ref().deep_copy())
    }
}

impl<T> DeepCopy for Rc<T>
where
    T: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        Rc::new(self.as_ref().deep_copy())
    }
}

impl<T> DeepCopy for Vec<T>
where
    T: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        self.iter().map(DeepCopy::deep_copy).collect()
    }
}

impl<T> DeepCopy for VecDeque<T>
where
    T: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        self.iter().map(DeepCopy::deep_copy).collect()
    }
}

impl<A, B> DeepCopy for (A, B)
where
    A: DeepCopy,
    B: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        (self.0.deep_copy(), self.1.deep_copy())
    }
}

impl<K, V> DeepCopy for BTreeMap<K, V>
where
    K: Ord + DeepCopy,
    V: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        self.iter().map(|(k, v)| (k.deep_copy(), v.deep_copy())).collect()
    }
}

impl<K, V> DeepCopy for HashMap<K, V>
where
    K: Eq + Hash + DeepCopy,
    V: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        self.iter().map(|(k, v)| (k.deep_copy(), v.deep_copy())).collect()
    }
}

#[cfg(test)]
#[path = "traits_test.rs"]
mod traits_test;
