use log::debug;
use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};

use std::{
    fmt,
    iter::FromIterator,
    result,
    sync::atomic::{AtomicU64, Ordering::SeqCst},
};

use crate::{config::Config, traits::DeepCopy, util::Spinlock, Result};

const TARGET: &str = "list";

// Slot index of the sentinel, it closes the ring.
const ROOT: usize = 0;

static LIST_ID: AtomicU64 = AtomicU64::new(1);

fn next_list_id() -> u64 {
    LIST_ID.fetch_add(1, SeqCst)
}

/// Handle to a value in a [List].
///
/// A handle is only a position, it does not borrow the list. Handles
/// from another list, or to a value that was since removed, are
/// ignored by the positional operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Element {
    list: u64,
    slot: usize,
    gen: u64,
}

struct Slot<T> {
    value: Option<T>,
    prev: usize,
    next: usize,
    // bumped every time the slot is released.
    gen: u64,
}

struct Inner<T> {
    id: u64,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Inner<T> {
    fn new() -> Inner<T> {
        let root = Slot {
            value: None,
            prev: ROOT,
            next: ROOT,
            gen: 0,
        };
        Inner {
            id: next_list_id(),
            slots: vec![root],
            free: vec![],
            len: 0,
        }
    }

    fn to_element(&self, slot: usize) -> Option<Element> {
        match slot {
            ROOT => None,
            slot => Some(Element {
                list: self.id,
                slot,
                gen: self.slots[slot].gen,
            }),
        }
    }

    // resolve handle to a live slot of this list.
    fn resolve(&self, e: &Element) -> Option<usize> {
        if e.list != self.id || e.slot == ROOT {
            return None;
        }
        match self.slots.get(e.slot) {
            Some(s) if s.gen == e.gen && s.value.is_some() => Some(e.slot),
            _ => None,
        }
    }

    #[inline]
    fn front(&self) -> usize {
        self.slots[ROOT].next
    }

    #[inline]
    fn back(&self) -> usize {
        self.slots[ROOT].prev
    }

    fn value(&self, slot: usize) -> &T {
        match &self.slots[slot].value {
            Some(value) => value,
            None => panic!("vacant slot {} in list, call the programmer", slot),
        }
    }

    fn alloc(&mut self, value: T) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot].value = Some(value);
                slot
            }
            None => {
                self.slots.push(Slot {
                    value: Some(value),
                    prev: ROOT,
                    next: ROOT,
                    gen: 0,
                });
                self.slots.len() - 1
            }
        }
    }

    // link `slot` right after `at`.
    fn link_after(&mut self, at: usize, slot: usize) {
        let next = self.slots[at].next;
        self.slots[slot].prev = at;
        self.slots[slot].next = next;
        self.slots[next].prev = slot;
        self.slots[at].next = slot;
        self.len += 1;
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        self.slots[prev].next = next;
        self.slots[next].prev = prev;
        self.len -= 1;
    }

    fn insert_after(&mut self, at: usize, value: T) -> usize {
        let slot = self.alloc(value);
        self.link_after(at, slot);
        slot
    }

    fn remove(&mut self, slot: usize) -> Option<T> {
        self.unlink(slot);
        let s = &mut self.slots[slot];
        s.gen += 1;
        self.free.push(slot);
        s.value.take()
    }

    fn move_after(&mut self, slot: usize, at: usize) {
        if slot != at {
            self.unlink(slot);
            self.link_after(at, slot);
        }
    }

    // walk from `slot` in `next` direction, or `prev` if `rev`, until
    // the sentinel is reached or `f` returns false.
    fn walk<F>(&self, rev: bool, mut f: F)
    where
        F: FnMut(usize, &T) -> bool,
    {
        let mut slot = if rev { self.back() } else { self.front() };
        while slot != ROOT {
            if !f(slot, self.value(slot)) {
                break;
            }
            slot = if rev {
                self.slots[slot].prev
            } else {
                self.slots[slot].next
            };
        }
    }

    fn search(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        let mut found = None;
        self.walk(false, |slot, v| {
            if v == value {
                found = Some(slot);
            }
            found.is_none()
        });
        found
    }

    fn to_values(&self, rev: bool) -> Vec<T>
    where
        T: Clone,
    {
        let mut values = Vec::with_capacity(self.len);
        self.walk(rev, |_, v| {
            values.push(v.clone());
            true
        });
        values
    }

    fn pop(&mut self, back: bool) -> Option<T> {
        match if back { self.back() } else { self.front() } {
            ROOT => None,
            slot => self.remove(slot),
        }
    }

    fn clear(&mut self) {
        *self = Inner::new();
    }
}

/// Doubly linked list, with stable [Element] handles.
///
/// Values are stored in an arena of slots, each slot linked to its
/// neighbours by index. Every list carries a process unique id, which
/// is stamped into the handles it hands out.
pub struct List<T> {
    name: String,
    inner: Spinlock<Inner<T>>,
}

impl<T> List<T> {
    /// Create an empty list. With `safe` as false, caller shall
    /// serialize access to the list.
    pub fn new(safe: bool) -> List<T> {
        let mut config = Config::default();
        config.set_safe(safe);
        Self::with_config(&config)
    }

    pub fn with_config(config: &Config) -> List<T> {
        List {
            name: config.name.clone(),
            inner: Spinlock::new(Inner::new(), config.safe, config.spin),
        }
    }

    /// Create a list from `values`, in iteration order.
    pub fn from_values<I>(values: I, safe: bool) -> List<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut list = Self::new(safe);
        {
            let inner = list.inner.get_mut();
            for value in values {
                let at = inner.back();
                inner.insert_after(at, value);
            }
        }
        list
    }

    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    pub fn is_safe(&self) -> bool {
        self.inner.is_safe()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_front(&self, value: T) -> Element {
        let mut inner = self.inner.write();
        let slot = inner.insert_after(ROOT, value);
        Element {
            list: inner.id,
            slot,
            gen: inner.slots[slot].gen,
        }
    }

    pub fn push_back(&self, value: T) -> Element {
        let mut inner = self.inner.write();
        let at = inner.back();
        let slot = inner.insert_after(at, value);
        Element {
            list: inner.id,
            slot,
            gen: inner.slots[slot].gen,
        }
    }

    /// Push `values` at the front, one by one, so that the last value
    /// ends up at the front.
    pub fn push_fronts<I>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut inner = self.inner.write();
        for value in values {
            inner.insert_after(ROOT, value);
        }
    }

    /// Push `values` at the back, in iteration order.
    pub fn push_backs<I>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut inner = self.inner.write();
        for value in values {
            let at = inner.back();
            inner.insert_after(at, value);
        }
    }

    pub fn pop_front(&self) -> Option<T> {
        self.inner.write().pop(false)
    }

    pub fn pop_back(&self) -> Option<T> {
        self.inner.write().pop(true)
    }

    /// Pop at most `max` values from the front, in pop order.
    pub fn pop_fronts(&self, max: usize) -> Vec<T> {
        let mut inner = self.inner.write();
        let n = usize::min(max, inner.len);
        (0..n).filter_map(|_| inner.pop(false)).collect()
    }

    /// Pop at most `max` values from the back, in pop order.
    pub fn pop_backs(&self, max: usize) -> Vec<T> {
        let mut inner = self.inner.write();
        let n = usize::min(max, inner.len);
        (0..n).filter_map(|_| inner.pop(true)).collect()
    }

    /// Pop every value from the front, list is left empty.
    pub fn pop_front_all(&self) -> Vec<T> {
        self.pop_fronts(usize::MAX)
    }

    /// Pop every value from the back, list is left empty.
    pub fn pop_back_all(&self) -> Vec<T> {
        self.pop_backs(usize::MAX)
    }

    /// Copy of all values, front to back.
    pub fn front_all(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.read().to_values(false)
    }

    /// Copy of all values, back to front.
    pub fn back_all(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.read().to_values(true)
    }

    pub fn front_value(&self) -> Option<T>
    where
        T: Clone,
    {
        let inner = self.inner.read();
        match inner.front() {
            ROOT => None,
            slot => Some(inner.value(slot).clone()),
        }
    }

    pub fn back_value(&self) -> Option<T>
    where
        T: Clone,
    {
        let inner = self.inner.read();
        match inner.back() {
            ROOT => None,
            slot => Some(inner.value(slot).clone()),
        }
    }

    pub fn front(&self) -> Option<Element> {
        let inner = self.inner.read();
        inner.to_element(inner.front())
    }

    pub fn back(&self) -> Option<Element> {
        let inner = self.inner.read();
        inner.to_element(inner.back())
    }

    /// Handle next to `e`, None at the back of the list or if `e` is
    /// not a live handle of this list.
    pub fn next(&self, e: &Element) -> Option<Element> {
        let inner = self.inner.read();
        let slot = inner.resolve(e)?;
        inner.to_element(inner.slots[slot].next)
    }

    /// Handle previous to `e`, None at the front of the list or if `e`
    /// is not a live handle of this list.
    pub fn prev(&self, e: &Element) -> Option<Element> {
        let inner = self.inner.read();
        let slot = inner.resolve(e)?;
        inner.to_element(inner.slots[slot].prev)
    }

    pub fn value(&self, e: &Element) -> Option<T>
    where
        T: Clone,
    {
        self.value_with(e, T::clone)
    }

    /// Apply `f` on the value at `e`, under the read latch.
    pub fn value_with<F, R>(&self, e: &Element, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        let inner = self.inner.read();
        inner.resolve(e).map(|slot| f(inner.value(slot)))
    }

    /// Replace the value at `e`, return the old value. Stale or foreign
    /// handles are ignored.
    pub fn set_value(&self, e: &Element, value: T) -> Option<T> {
        let mut inner = self.inner.write();
        let slot = inner.resolve(e)?;
        inner.slots[slot].value.replace(value)
    }

    /// Insert `value` before `mark`, return its handle. Nothing is
    /// inserted if `mark` is stale or foreign.
    pub fn insert_before(&self, mark: &Element, value: T) -> Option<Element> {
        let mut inner = self.inner.write();
        let at = match inner.resolve(mark) {
            Some(slot) => inner.slots[slot].prev,
            None => {
                debug!(target: TARGET, "{} ignored foreign handle {:?}", self.name, mark);
                return None;
            }
        };
        let slot = inner.insert_after(at, value);
        inner.to_element(slot)
    }

    /// Insert `value` after `mark`, return its handle. Nothing is
    /// inserted if `mark` is stale or foreign.
    pub fn insert_after(&self, mark: &Element, value: T) -> Option<Element> {
        let mut inner = self.inner.write();
        let at = match inner.resolve(mark) {
            Some(slot) => slot,
            None => {
                debug!(target: TARGET, "{} ignored foreign handle {:?}", self.name, mark);
                return None;
            }
        };
        let slot = inner.insert_after(at, value);
        inner.to_element(slot)
    }

    pub fn move_to_front(&self, e: &Element) {
        let mut inner = self.inner.write();
        match inner.resolve(e) {
            Some(slot) => inner.move_after(slot, ROOT),
            None => debug!(target: TARGET, "{} ignored foreign handle {:?}", self.name, e),
        }
    }

    pub fn move_to_back(&self, e: &Element) {
        let mut inner = self.inner.write();
        match inner.resolve(e) {
            Some(slot) => {
                let at = inner.back();
                inner.move_after(slot, at)
            }
            None => debug!(target: TARGET, "{} ignored foreign handle {:?}", self.name, e),
        }
    }

    /// Move `e` right before `mark`. No-op if `e == mark` or either
    /// handle is stale or foreign.
    pub fn move_before(&self, e: &Element, mark: &Element) {
        let mut inner = self.inner.write();
        match (inner.resolve(e), inner.resolve(mark)) {
            (Some(slot), Some(mslot)) if slot != mslot => {
                inner.unlink(slot);
                let at = inner.slots[mslot].prev;
                inner.link_after(at, slot);
            }
            (Some(_), Some(_)) => (),
            _ => debug!(target: TARGET, "{} ignored foreign handle {:?}", self.name, e),
        }
    }

    /// Move `e` right after `mark`. No-op if `e == mark` or either
    /// handle is stale or foreign.
    pub fn move_after(&self, e: &Element, mark: &Element) {
        let mut inner = self.inner.write();
        match (inner.resolve(e), inner.resolve(mark)) {
            (Some(slot), Some(mslot)) => inner.move_after(slot, mslot),
            _ => debug!(target: TARGET, "{} ignored foreign handle {:?}", self.name, e),
        }
    }

    /// Remove the value at `e` and return it. Stale or foreign handles
    /// are ignored.
    pub fn remove(&self, e: &Element) -> Option<T> {
        let mut inner = self.inner.write();
        match inner.resolve(e) {
            Some(slot) => inner.remove(slot),
            None => {
                debug!(target: TARGET, "{} ignored foreign handle {:?}", self.name, e);
                None
            }
        }
    }

    /// Remove a batch of handles, return the number of values removed.
    pub fn removes(&self, elements: &[Element]) -> usize {
        let mut inner = self.inner.write();
        let mut n = 0;
        for e in elements.iter() {
            if let Some(slot) = inner.resolve(e) {
                inner.remove(slot);
                n += 1;
            }
        }
        n
    }

    /// Remove the first occurrence of each of `values`, return whether
    /// the list changed.
    pub fn remove_values(&self, values: &[T]) -> bool
    where
        T: PartialEq,
    {
        let mut inner = self.inner.write();
        let mut changed = false;
        for value in values.iter() {
            if let Some(slot) = inner.search(value) {
                inner.remove(slot);
                changed = true;
            }
        }
        changed
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.inner.read().search(value).is_some()
    }

    /// Append a copy of `other`'s values, `other` can be this same list,
    /// in which case the list doubles exactly once.
    pub fn push_back_list(&self, other: &List<T>)
    where
        T: Clone,
    {
        if std::ptr::eq(self, other) {
            let mut inner = self.inner.write();
            let values = inner.to_values(false);
            for value in values.into_iter() {
                let at = inner.back();
                inner.insert_after(at, value);
            }
        } else {
            self.push_backs(other.front_all())
        }
    }

    /// Prepend a copy of `other`'s values, preserving their order.
    pub fn push_front_list(&self, other: &List<T>)
    where
        T: Clone,
    {
        let values = if std::ptr::eq(self, other) {
            None
        } else {
            Some(other.back_all())
        };
        let mut inner = self.inner.write();
        let values = match values {
            Some(values) => values,
            None => inner.to_values(true),
        };
        for value in values.into_iter() {
            inner.insert_after(ROOT, value);
        }
    }

    pub fn clear(&self) {
        let n = {
            let mut inner = self.inner.write();
            let n = inner.len;
            inner.clear();
            n
        };
        debug!(target: TARGET, "{} cleared {} values", self.name, n);
    }

    /// Alias for [iterate_asc][Self::iterate_asc].
    pub fn iterate<F>(&self, f: F)
    where
        F: FnMut(Element, &T) -> bool,
    {
        self.iterate_asc(f)
    }

    /// Iterate front to back until `f` returns false. `f` is called
    /// under the read latch and must not mutate this list.
    pub fn iterate_asc<F>(&self, mut f: F)
    where
        F: FnMut(Element, &T) -> bool,
    {
        let inner = self.inner.read();
        inner.walk(false, |slot, v| match inner.to_element(slot) {
            Some(e) => f(e, v),
            None => false,
        });
    }

    /// Iterate back to front until `f` returns false.
    pub fn iterate_desc<F>(&self, mut f: F)
    where
        F: FnMut(Element, &T) -> bool,
    {
        let inner = self.inner.read();
        inner.walk(true, |slot, v| match inner.to_element(slot) {
            Some(e) => f(e, v),
            None => false,
        });
    }

    /// Join values, front to back, with `glue`.
    pub fn join(&self, glue: &str) -> String
    where
        T: fmt::Display,
    {
        let inner = self.inner.read();
        let mut parts = Vec::with_capacity(inner.len);
        inner.walk(false, |_, v| {
            parts.push(v.to_string());
            true
        });
        parts.join(glue)
    }

    pub fn to_json(&self) -> Result<String>
    where
        T: Serialize,
    {
        err_at!(FailJson, serde_json::to_string(self))
    }

    /// Build a list from JSON array `text`.
    pub fn from_json(text: &str, safe: bool) -> Result<List<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let values: Vec<T> = err_at!(FailJson, serde_json::from_str(text))?;
        Ok(Self::from_values(values, safe))
    }

    /// Append values from JSON array `text`.
    pub fn load_json(&self, text: &str) -> Result<()>
    where
        T: serde::de::DeserializeOwned,
    {
        let values: Vec<T> = err_at!(FailJson, serde_json::from_str(text))?;
        let n = values.len();
        self.push_backs(values);
        debug!(target: TARGET, "{} loaded {} values from json", self.name, n);
        Ok(())
    }
}

/// Copy of the values into a new list, handles of this list are not
/// valid on the clone.
impl<T> Clone for List<T>
where
    T: Clone,
{
    fn clone(&self) -> List<T> {
        let values = self.front_all();
        let mut list = Self::from_values(values, self.inner.is_safe());
        list.name = self.name.clone();
        list
    }
}

impl<T> DeepCopy for List<T>
where
    T: DeepCopy,
{
    fn deep_copy(&self) -> List<T> {
        let values: Vec<T> = {
            let inner = self.inner.read();
            let mut values = Vec::with_capacity(inner.len);
            inner.walk(false, |_, v| {
                values.push(v.deep_copy());
                true
            });
            values
        };
        debug!(target: TARGET, "{} deep copied {} values", self.name, values.len());
        let mut list = Self::from_values(values, self.inner.is_safe());
        list.name = self.name.clone();
        list
    }
}

impl<T> Default for List<T> {
    fn default() -> List<T> {
        List::with_config(&Config::default())
    }
}

/// Lists are equal when they hold equal values in the same order.
impl<T> PartialEq for List<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &List<T>) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        // latches are taken in address order, so two threads comparing
        // the same pair of lists never wait on each other.
        let (a, b) = if (self as *const Self) < (other as *const Self) {
            let a = self.inner.read();
            (a, other.inner.read())
        } else {
            let b = other.inner.read();
            (self.inner.read(), b)
        };
        if a.len != b.len {
            return false;
        }
        let (mut x, mut y) = (a.front(), b.front());
        while x != ROOT && y != ROOT {
            if a.value(x) != b.value(y) {
                return false;
            }
            x = a.slots[x].next;
            y = b.slots[y].next;
        }
        true
    }
}

/// Format as `[v1,v2,v3]`.
impl<T> fmt::Display for List<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.join(","))
    }
}

impl<T> fmt::Debug for List<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.read();
        let mut list = f.debug_list();
        inner.walk(false, |_, v| {
            list.entry(v);
            true
        });
        list.finish()
    }
}

impl<T> Serialize for List<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let inner = self.inner.read();
        let mut seq = serializer.serialize_seq(Some(inner.len))?;
        let mut res = Ok(());
        inner.walk(false, |_, v| {
            res = seq.serialize_element(v);
            res.is_ok()
        });
        res?;
        seq.end()
    }
}

/// Deserialize from a sequence into a safe list.
impl<'de, T> Deserialize<'de> for List<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(List::from_values(values, true))
    }
}

/// Collect into a safe list.
impl<T> FromIterator<T> for List<T> {
    fn from_iter<I>(iter: I) -> List<T>
    where
        I: IntoIterator<Item = T>,
    {
        List::from_values(iter, true)
    }
}

impl<T> Extend<T> for List<T> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let inner = self.inner.get_mut();
        for value in iter {
            let at = inner.back();
            inner.insert_after(at, value);
        }
    }
}

#[cfg(test)]
#[path = "dlist_test.rs"]
mod dlist_test;
