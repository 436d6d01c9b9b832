//! Wallet lookup cache.
//!
//! Remembers whether a wallet exists for a `(client, currency)` pair, and its id
//! when it does. Absence is remembered for exactly as long as presence: a client
//! that never touched a currency would otherwise cost one query per admission
//! check.
//!
//! Entries expire a fixed time after they are written and the least recently
//! used entry is evicted when the cache is full. A loader error is handed back
//! to the caller and leaves nothing behind, so the next call queries again.
//! Concurrent misses on one key wait on a per-key gate and share a single load.

use crate::clock::{Clock, SystemClock};
use crate::config::{CacheSpec, ConfigError};
use crate::gates::KeyedGates;
use crate::store::StoreError;
use crate::types::{Timestamp, WalletId};
use crate::wallet::WalletKey;
use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Get-or-populate capability the engine resolves wallet ids through.
pub trait WalletIdLookup: Send + Sync {
    fn lookup(
        &self,
        key: &WalletKey,
        load: &mut dyn FnMut() -> Result<Option<WalletId>, StoreError>,
    ) -> Result<Option<WalletId>, StoreError>;

    /// Drops whatever is cached for `key`.
    fn invalidate(&self, key: &WalletKey);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    written_at: Timestamp,
    last_used: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    slots: HashMap<K, Slot<V>>,
    tick: u64,
}

/// Bounded, expire-after-write, least-recently-used map.
pub struct ExpiringCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    loading: KeyedGates<K>,
    capacity: usize,
    ttl_millis: i64,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                tick: 0,
            }),
            loading: KeyedGates::new(),
            capacity: capacity.max(1),
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Fresh value for `key`, if any. Counts as a use for LRU purposes.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.fresh(&mut inner, key, now)
    }

    /// Returns the cached value or runs `load` once and caches what it returns.
    pub fn get_or_try_insert_with<E, F>(&self, key: &K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.loading.run(key, || -> Result<V, E> {
            // someone else may have populated it while we waited on the gate
            if let Some(value) = self.get(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            let value = load()?;
            self.insert(key.clone(), value.clone());
            Ok(value)
        })
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.slots.contains_key(&key) && inner.slots.len() >= self.capacity {
            self.purge_expired(&mut inner, now);
            if inner.slots.len() >= self.capacity {
                self.evict_least_recent(&mut inner);
            }
        }

        inner.slots.insert(
            key,
            Slot {
                value,
                written_at: now,
                last_used: tick,
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.inner.lock().slots.remove(key);
    }

    /// Live entries. Expired ones are purged first.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.purge_expired(&mut inner, now);
        inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn fresh(&self, inner: &mut Inner<K, V>, key: &K, now: Timestamp) -> Option<V> {
        inner.tick += 1;
        let tick = inner.tick;
        match inner.slots.get_mut(key) {
            None => return None,
            Some(slot) if now.millis_since(slot.written_at) < self.ttl_millis => {
                slot.last_used = tick;
                return Some(slot.value.clone());
            }
            Some(_) => {}
        }
        inner.slots.remove(key);
        trace!("cache entry expired");
        None
    }

    fn purge_expired(&self, inner: &mut Inner<K, V>, now: Timestamp) {
        let ttl = self.ttl_millis;
        let before = inner.slots.len();
        inner
            .slots
            .retain(|_, slot| now.millis_since(slot.written_at) < ttl);
        let purged = before - inner.slots.len();
        if purged > 0 {
            debug!("purged {} expired cache entries", purged);
        }
    }

    fn evict_least_recent(&self, inner: &mut Inner<K, V>) {
        let victim = inner
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone());
        if let Some(victim) = victim {
            inner.slots.remove(&victim);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!("evicted least recently used cache entry");
        }
    }

    #[cfg(test)]
    fn loading_keys(&self) -> usize {
        self.loading.len()
    }
}

/// Default [`WalletIdLookup`]: caches `Option<WalletId>` per wallet key.
pub struct WalletLookupCache {
    cache: ExpiringCache<WalletKey, Option<WalletId>>,
}

impl WalletLookupCache {
    /// Fails on a spec that could not hold or keep anything.
    pub fn new(spec: &CacheSpec, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        spec.validate()?;
        let capacity = usize::try_from(spec.size).unwrap_or(usize::MAX);
        Ok(Self {
            cache: ExpiringCache::new(capacity, spec.ttl(), clock),
        })
    }

    pub fn with_system_clock(spec: &CacheSpec) -> Result<Self, ConfigError> {
        Self::new(spec, Arc::new(SystemClock))
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl WalletIdLookup for WalletLookupCache {
    fn lookup(
        &self,
        key: &WalletKey,
        load: &mut dyn FnMut() -> Result<Option<WalletId>, StoreError>,
    ) -> Result<Option<WalletId>, StoreError> {
        self.cache.get_or_try_insert_with(key, || {
            debug!("wallet id cache miss for {}", key);
            load()
        })
    }

    fn invalidate(&self, key: &WalletKey) {
        debug!("invalidating cached wallet id for {}", key);
        self.cache.invalidate(key);
    }
}
