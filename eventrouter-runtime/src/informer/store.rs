//! Cache of the last seen state of every watched event
use eventrouter_core::{Event, EventKey};
use parking_lot::RwLock;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

type Cache = Arc<RwLock<HashMap<EventKey, Arc<Event>>>>;

/// A writable Store handle
///
/// This is exclusive to one [`Informer`](super::Informer), since a relist clobbers
/// whatever another writer would have put in.
#[derive(Debug, Default)]
pub struct Writer {
    store: Cache,
}

impl Writer {
    /// Return a read handle to the store
    ///
    /// Multiple read handles may be obtained, by either calling `as_reader` multiple times,
    /// or by calling `Store::clone()` afterwards.
    #[must_use]
    pub fn as_reader(&self) -> Store {
        Store {
            store: self.store.clone(),
        }
    }

    /// Last seen state of `key`
    pub(crate) fn get(&self, key: &EventKey) -> Option<Arc<Event>> {
        self.store.read().get(key).cloned()
    }

    /// Remember `event` as the last seen state of `key`
    pub(crate) fn insert(&mut self, key: EventKey, event: Arc<Event>) {
        self.store.write().insert(key, event);
    }

    /// Forget `key`, returning what was cached for it
    pub(crate) fn remove(&mut self, key: &EventKey) -> Option<Arc<Event>> {
        self.store.write().remove(key)
    }

    /// Drop every entry whose key is not in `seen`, returning the dropped entries
    ///
    /// Used at the end of a relist to find objects that disappeared while we were not watching.
    pub(crate) fn retain_seen(&mut self, seen: &HashSet<EventKey>) -> Vec<Arc<Event>> {
        let mut store = self.store.write();
        let gone = store
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect::<Vec<_>>();
        gone.iter().filter_map(|key| store.remove(key)).collect()
    }
}

/// A readable cache of the last seen state of every watched event
///
/// Cloning will produce a new reference to the same backing store.
///
/// Cannot be constructed directly since one writer handle is required,
/// use [`Informer::store`](super::Informer::store) instead.
#[derive(Debug, Clone)]
pub struct Store {
    store: Cache,
}

impl Store {
    /// Retrieve the entry referred to by `key`, if it is in the cache.
    ///
    /// Note that this is a cache and may be stale. Expired events may still exist in the cache
    /// after the apiserver garbage collected them, and new ones may not yet exist in the cache.
    #[must_use]
    pub fn get(&self, key: &EventKey) -> Option<Arc<Event>> {
        self.store.read().get(key).cloned()
    }

    /// Return a full snapshot of the current values
    #[must_use]
    pub fn state(&self) -> Vec<Arc<Event>> {
        self.store.read().values().cloned().collect()
    }

    /// Number of cached events
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }
}
