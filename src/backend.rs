//! Pluggable map backends.
//!
//! The store never intercepts individual mutations: callers go straight to the
//! backend, and a save takes a [`snapshot`](MapBackend::snapshot). How
//! consistent that snapshot is depends on the backend:
//!
//! - `RwLock<IndexMap>` (the default) clones the whole map under one read lock,
//!   so every save observes a single point in time. Entries keep the order
//!   they were loaded and inserted in, so an untouched store saves back the
//!   same bytes it loaded.
//! - `RwLock<HashMap>` has the same consistency but no stable order.
//! - `ShardMap` and `DashMap` snapshot shard by shard. A save that races with
//!   writers can see some of their updates and miss others.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::Hash;

/// Trait that a concurrent map must satisfy to back a [`FileMap`](crate::FileMap).
///
/// Every method works with owned values so the store API stays the same for
/// every backend. Backends that keep values behind an `Arc` (like ShardMap)
/// clone on read.
pub trait MapBackend<K, V>: Send + Sync
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Build a backend holding `entries`. Used once, when the store loads.
    fn from_entries(entries: IndexMap<K, V>) -> Self
    where
        Self: Sized;

    /// Insert a key-value pair, returning the previous value if any.
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Look up a value by key.
    fn get(&self, key: &K) -> Option<V>;

    /// Remove a key, returning its value if it was present.
    fn remove(&self, key: &K) -> Option<V>;

    /// Copy of every entry, detached from the backend.
    fn snapshot(&self) -> IndexMap<K, V>;

    /// Number of entries.
    fn len(&self) -> usize;

    /// `true` when there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a key exists. Override when the backend can skip the clone.
    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Apply `f` to the value at `key`. Returns `false` if the key is absent.
    ///
    /// The default is get-then-insert, which races with concurrent writers to
    /// the same key. Backends with mutable entry access override it.
    fn update<F>(&self, key: &K, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        match self.get(key) {
            Some(mut value) => {
                f(&mut value);
                self.insert(key.clone(), value);
                true
            }
            None => false,
        }
    }

    /// Drop all entries.
    fn clear(&self) {
        let keys: Vec<K> = self.snapshot().into_keys().collect();
        for k in &keys {
            self.remove(k);
        }
    }
}

// ---- RwLock<IndexMap> --------------------------------------------------------

impl<K, V> MapBackend<K, V> for parking_lot::RwLock<IndexMap<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn from_entries(entries: IndexMap<K, V>) -> Self {
        parking_lot::RwLock::new(entries)
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    // shift, not swap: the survivors keep their relative order
    fn remove(&self, key: &K) -> Option<V> {
        self.write().shift_remove(key)
    }

    fn snapshot(&self) -> IndexMap<K, V> {
        self.read().clone()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    fn update<F>(&self, key: &K, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        self.write().get_mut(key).map(f).is_some()
    }

    fn clear(&self) {
        self.write().clear()
    }
}

// ---- RwLock<HashMap> ---------------------------------------------------------

impl<K, V> MapBackend<K, V> for parking_lot::RwLock<HashMap<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn from_entries(entries: IndexMap<K, V>) -> Self {
        parking_lot::RwLock::new(entries.into_iter().collect())
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.write().remove(key)
    }

    fn snapshot(&self) -> IndexMap<K, V> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    fn update<F>(&self, key: &K, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        self.write().get_mut(key).map(f).is_some()
    }

    fn clear(&self) {
        self.write().clear()
    }
}

// ---- ShardMap ----------------------------------------------------------------

impl<K, V> MapBackend<K, V> for shardmap::ShardMap<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn from_entries(entries: IndexMap<K, V>) -> Self {
        let map = shardmap::ShardMap::default();
        for (k, v) in entries {
            map.insert(k, v);
        }
        map
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        self.insert(key, value).map(|arc| (*arc).clone())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.get(key).map(|arc| (*arc).clone())
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.remove(key).map(|arc| (*arc).clone())
    }

    fn snapshot(&self) -> IndexMap<K, V> {
        self.iter_snapshot()
            .map(|(k, arc_v)| (k, (*arc_v).clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.len()
    }

    // ShardMap::get hands back an Arc, so this is a refcount bump, not a clone.
    fn contains_key(&self, key: &K) -> bool {
        shardmap::ShardMap::get(self, key).is_some()
    }
}

// ---- DashMap (feature-gated) -------------------------------------------------

#[cfg(feature = "dashmap")]
impl<K, V> MapBackend<K, V> for dashmap::DashMap<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn from_entries(entries: IndexMap<K, V>) -> Self {
        entries.into_iter().collect()
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        self.insert(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.get(key).map(|r| r.value().clone())
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.remove(key).map(|(_, v)| v)
    }

    fn snapshot(&self) -> IndexMap<K, V> {
        self.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &K) -> bool {
        dashmap::DashMap::contains_key(self, key)
    }

    fn update<F>(&self, key: &K, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        match self.get_mut(key) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        dashmap::DashMap::clear(self)
    }
}
