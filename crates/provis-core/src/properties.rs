//! Ordered string property storage.
//!
//! Profiles, per-unit profile entries and artifact descriptors all keep their
//! properties in a [`PropertyStore`]. Iteration always follows insertion order,
//! so a store written out and read back keeps the layout its author chose.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered `key -> value` map of strings.
///
/// Single-writer: callers serialize mutation themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyStore {
    entries: IndexMap<String, String>,
}

impl PropertyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Get the value stored for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Store `value` under `key`, returning the previous value.
    ///
    /// Overwriting an existing key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value.
    ///
    /// The relative order of the remaining entries is preserved.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All entries, in insertion order.
    pub fn get_all(&self) -> &IndexMap<String, String> {
        &self.entries
    }

    /// Copy every entry of `other` into this store.
    pub fn put_all<K, V, I>(&mut self, other: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in other {
            self.entries.insert(key.into(), value.into());
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = PropertyStore::new();
        store.put_all(iter);
        store
    }
}

impl<'a> IntoIterator for &'a PropertyStore {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
