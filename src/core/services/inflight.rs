use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, OnceLock};

/// Coalesces identical requests that are in flight at the same time.
///
/// The first caller for a key registers a shared cell and does the
/// work; callers arriving meanwhile block on that cell and receive a
/// clone of the same value. The entry is dropped once the registering
/// caller is done, so a later request starts fresh.
pub struct InFlight<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceLock<V>>>>,
}

/// Drops the registering caller's slot, also when `work` panics.
struct Release<'a, K: Eq + Hash, V> {
    slots: &'a Mutex<HashMap<K, Arc<OnceLock<V>>>>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for Release<'_, K, V> {
    fn drop(&mut self) {
        self.slots
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}

impl<K, V> Default for InFlight<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> InFlight<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless an identical request is already running.
    pub fn run<F: FnOnce() -> V>(&self, key: K, work: F) -> V {
        let (cell, registered) = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            match slots.get(&key) {
                Some(cell) => (Arc::clone(cell), false),
                None => {
                    let cell = Arc::new(OnceLock::new());
                    slots.insert(key.clone(), Arc::clone(&cell));
                    (cell, true)
                }
            }
        };

        let _slot = registered.then(|| Release { slots: &self.slots, key });
        cell.get_or_init(work).clone()
    }

    /// Number of requests currently registered.
    pub fn pending(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}
