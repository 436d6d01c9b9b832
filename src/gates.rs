// 11.0 gates.rs: one mutex per key, created on first use and dropped when the
// last caller inside or waiting on it leaves. users are counted under the map
// lock, so removal never races a late arrival.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

struct Slot {
    gate: Arc<Mutex<()>>,
    users: usize,
}

pub(crate) struct KeyedGates<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K: Eq + Hash + Clone> KeyedGates<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` while holding the gate for `key`. Callers on other keys are not blocked.
    pub(crate) fn run<T>(&self, key: &K, f: impl FnOnce() -> T) -> T {
        let gate = self.enter(key);
        let _pass = Pass { gates: self, key };
        let _held = gate.lock();
        f()
    }

    /// Keys with a caller inside or waiting.
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }

    fn enter(&self, key: &K) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
            gate: Arc::new(Mutex::new(())),
            users: 0,
        });
        slot.users += 1;
        slot.gate.clone()
    }

    fn leave(&self, key: &K) {
        let mut slots = self.slots.lock();
        let empty = match slots.get_mut(key) {
            Some(slot) => {
                slot.users = slot.users.saturating_sub(1);
                slot.users == 0
            }
            None => false,
        };
        if empty {
            slots.remove(key);
        }
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedGates<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for KeyedGates<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedGates")
            .field("keys", &self.slots.lock().len())
            .finish()
    }
}

// leaves on drop, so a panicking closure still releases its slot
struct Pass<'a, K: Eq + Hash + Clone> {
    gates: &'a KeyedGates<K>,
    key: &'a K,
}

impl<K: Eq + Hash + Clone> Drop for Pass<'_, K> {
    fn drop(&mut self) {
        self.gates.leave(self.key);
    }
}
