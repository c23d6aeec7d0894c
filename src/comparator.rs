//! Module `comparator` define the ordering contract for tree containers.
//!
//! A comparator is a total-order function over keys. Trees never use `==`
//! or `Ord` on keys directly, every lookup and every placement is routed
//! through the comparator supplied at construction time.

use std::{cmp::Ordering, sync::Arc};

/// Shared, immutable comparator. Receives `(a, b)` and returns the
/// ordering of `a` with respect to `b`.
pub type Comparator<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// Comparator using the natural order of `K`.
pub fn natural<K>() -> Comparator<K>
where
    K: 'static + Ord,
{
    Arc::new(|a: &K, b: &K| a.cmp(b))
}

/// Comparator ordering keys by their string representation, byte-wise.
pub fn string<K>() -> Comparator<K>
where
    K: 'static + AsRef<str>,
{
    Arc::new(|a: &K, b: &K| a.as_ref().cmp(b.as_ref()))
}

/// Comparator reversing the order of `cmp`.
pub fn reverse<K>(cmp: Comparator<K>) -> Comparator<K>
where
    K: 'static,
{
    Arc::new(move |a: &K, b: &K| cmp(b, a))
}

/// Comparator ordering keys by a projection `f`.
pub fn by_key<K, T, F>(f: F) -> Comparator<K>
where
    K: 'static,
    T: Ord,
    F: 'static + Send + Sync + Fn(&K) -> T,
{
    Arc::new(move |a: &K, b: &K| f(a).cmp(&f(b)))
}

/// Wrap a plain closure as comparator.
pub fn from_fn<K, F>(f: F) -> Comparator<K>
where
    F: 'static + Send + Sync + Fn(&K, &K) -> Ordering,
{
    Arc::new(f)
}

#[cfg(test)]
#[path = "comparator_test.rs"]
mod comparator_test;
