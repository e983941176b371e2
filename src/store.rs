//! Value storage.
//!
//! The trie only keeps [`DataKey`]s. Whoever owns the values decides what
//! "equal" means: two records are merged exactly when their keys are equal.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Handle to a value in a [`ValueStore`]. Equal values share a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataKey(u32);

impl DataKey {
    /// Slot index of the value in its store.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reference-counted, content-addressed storage for inserted values.
///
/// Every `Data` record in the trie owns one reference to its key.
pub trait ValueStore<V> {
    /// Stores `value` (or takes a reference to an equal stored value).
    fn store(&mut self, value: V) -> Result<DataKey>;

    /// Takes one more reference to `key`.
    fn retain(&mut self, key: DataKey);

    /// Releases one reference to `key`.
    fn remove(&mut self, key: DataKey);

    /// The value behind `key`, if it is still live.
    fn get(&self, key: DataKey) -> Option<&V>;
}

#[derive(Clone, Debug)]
struct Entry<V> {
    value: V,
    refs: usize,
}

/// In-memory [`ValueStore`] deduplicating values by `Eq + Hash`.
///
/// Freed slots are reused for new values.
#[derive(Clone, Debug)]
pub struct DataMap<V> {
    entries: Vec<Option<Entry<V>>>,
    index: HashMap<V, DataKey>,
    free: Vec<DataKey>,
}

impl<V> Default for DataMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
        }
    }
}

impl<V: Clone + Eq + Hash> DataMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live references to `key`; `0` once the value was released.
    pub fn references(&self, key: DataKey) -> usize {
        self.entries
            .get(key.index())
            .and_then(Option::as_ref)
            .map_or(0, |e| e.refs)
    }

    /// Live keys with their values, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (DataKey, &V)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (DataKey(i as u32), &e.value)))
    }

    fn next_key(&mut self) -> Result<DataKey> {
        if let Some(key) = self.free.pop() {
            return Ok(key);
        }
        let idx = u32::try_from(self.entries.len()).map_err(|_| Error::StoreExhausted)?;
        self.entries.push(None);
        Ok(DataKey(idx))
    }
}

impl<V: Clone + Eq + Hash> ValueStore<V> for DataMap<V> {
    fn store(&mut self, value: V) -> Result<DataKey> {
        if let Some(&key) = self.index.get(&value) {
            self.retain(key);
            return Ok(key);
        }
        let key = self.next_key()?;
        self.entries[key.index()] = Some(Entry {
            value: value.clone(),
            refs: 1,
        });
        self.index.insert(value, key);
        Ok(key)
    }

    fn retain(&mut self, key: DataKey) {
        if let Some(Some(entry)) = self.entries.get_mut(key.index()) {
            entry.refs += 1;
        }
    }

    fn remove(&mut self, key: DataKey) {
        let Some(slot) = self.entries.get_mut(key.index()) else {
            return;
        };
        let Some(entry) = slot.as_mut() else {
            return;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            if let Some(entry) = slot.take() {
                self.index.remove(&entry.value);
            }
            self.free.push(key);
        }
    }

    fn get(&self, key: DataKey) -> Option<&V> {
        self.entries
            .get(key.index())
            .and_then(Option::as_ref)
            .map(|e| &e.value)
    }
}
