//! A two-level concurrent map keyed by opaque `u32` handles: an outer lock
//! guards the key set, an inner lock per entry guards that entry's value.
//! Readers of one entry never block readers or writers of another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

pub struct ConcurrentIdMap<T> {
    next_id: AtomicU32,
    entries: RwLock<HashMap<u32, Arc<Mutex<T>>>>,
}

impl<T> Default for ConcurrentIdMap<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> ConcurrentIdMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh id and inserts `value` under it. Only takes the
    /// outer write lock; never blocks on another entry's inner lock.
    pub fn insert(&self, value: T) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .expect("registry lock poisoned")
            .insert(id, Arc::new(Mutex::new(value)));
        id
    }

    /// Runs `f` against the entry for `id` without holding the outer lock:
    /// the `Arc` clone releases the outer `RwLock` immediately, so a
    /// long-running `f` only contends with other accessors of this id.
    pub fn access<R>(&self, id: u32, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let entry = self
            .entries
            .read()
            .expect("registry lock poisoned")
            .get(&id)
            .cloned()?;
        let mut guard = entry.lock().expect("entry lock poisoned");
        Some(f(&mut guard))
    }

    /// Removes the entry from the map and waits for any in-flight `access`
    /// on this id to finish before returning the value.
    pub fn erase(&self, id: u32) -> Option<T> {
        let mut entry = self.entries.write().expect("registry lock poisoned").remove(&id)?;
        loop {
            match Arc::try_unwrap(entry) {
                Ok(mutex) => return Some(mutex.into_inner().expect("entry lock poisoned")),
                Err(shared) => {
                    // An access() call still holds a clone; wait for it to
                    // release the inner lock before trying again.
                    drop(shared.lock().expect("entry lock poisoned"));
                    entry = shared;
                }
            }
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.read().expect("registry lock poisoned").contains_key(&id)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` over every entry using `rayon`, each entry locked
    /// independently so two simultaneous entries never wait on each other.
    pub fn for_each_parallel(&self, f: impl Fn(u32, &mut T) + Sync)
    where
        T: Send,
    {
        let snapshot: Vec<(u32, Arc<Mutex<T>>)> = self
            .entries
            .read()
            .expect("registry lock poisoned")
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();
        use rayon::prelude::*;
        snapshot.into_par_iter().for_each(|(id, entry)| {
            f(id, &mut entry.lock().expect("entry lock poisoned"));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_access_erase_roundtrip() {
        let map: ConcurrentIdMap<i32> = ConcurrentIdMap::new();
        let id = map.insert(41);
        map.access(id, |v| *v += 1);
        assert_eq!(map.access(id, |v| *v), Some(42));
        assert_eq!(map.erase(id), Some(42));
        assert!(!map.contains(id));
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let map: ConcurrentIdMap<()> = ConcurrentIdMap::new();
        let a = map.insert(());
        let b = map.insert(());
        assert!(b > a);
    }
}
