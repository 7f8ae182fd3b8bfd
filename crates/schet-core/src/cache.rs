//! Content-addressed LRU cache for extraction results.
//!
//! Keys are MD5 digests of the raw document bytes. Every `get` hit and every
//! `set` counts as an access; the entry with the oldest access is evicted
//! when a new key arrives at capacity. All bookkeeping happens under one lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use md5::{Digest, Md5};
use tracing::{debug, trace};

use crate::error::CacheError;
use crate::models::config::DEFAULT_CACHE_CAPACITY;

/// 128-bit content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 16]);

impl CacheKey {
    /// Digest of `data`. Identical bytes always give identical keys.
    pub fn of(data: &[u8]) -> Self {
        Self(Md5::digest(data).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

struct State<V> {
    entries: HashMap<CacheKey, (V, u64)>,
    /// Access tick -> key; the first entry is the least recently used.
    recency: BTreeMap<u64, CacheKey>,
    next_tick: u64,
}

impl<V> State<V> {
    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }
}

/// Bounded LRU map from document digest to result.
pub struct ContentCache<V> {
    state: Mutex<State<V>>,
    capacity: usize,
}

impl<V: Clone> ContentCache<V> {
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_tick: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn key(data: &[u8]) -> CacheKey {
        CacheKey::of(data)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> Result<MutexGuard<'_, State<V>>, CacheError> {
        self.state.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Look up `key`, marking it most recently used on a hit.
    pub fn get(&self, key: &CacheKey) -> Result<Option<V>, CacheError> {
        let mut state = self.lock()?;
        let tick = state.tick();

        let Some((value, last)) = state.entries.get_mut(key) else {
            trace!(%key, "cache miss");
            return Ok(None);
        };
        let previous = std::mem::replace(last, tick);
        let value = value.clone();

        if state.recency.remove(&previous).is_none() {
            return Err(CacheError::Corrupted(format!("no recency slot for {}", key)));
        }
        state.recency.insert(tick, *key);

        trace!(%key, "cache hit");
        Ok(Some(value))
    }

    /// Insert or overwrite `key`, evicting the least recently used entry
    /// when a new key arrives at capacity.
    pub fn set(&self, key: CacheKey, value: V) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        let tick = state.tick();

        if let Some((_, previous)) = state.entries.insert(key, (value, tick)) {
            if state.recency.remove(&previous).is_none() {
                return Err(CacheError::Corrupted(format!("no recency slot for {}", key)));
            }
        } else if state.entries.len() > self.capacity {
            let Some((_, oldest)) = state.recency.pop_first() else {
                return Err(CacheError::Corrupted("recency list empty at capacity".to_string()));
            };
            if state.entries.remove(&oldest).is_none() {
                return Err(CacheError::Corrupted(format!("evicted key {} not stored", oldest)));
            }
            debug!(key = %oldest, "evicted least recently used entry");
        }

        state.recency.insert(tick, key);
        Ok(())
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        state.entries.clear();
        state.recency.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

impl<V: Clone> Default for ContentCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn key(n: u8) -> CacheKey {
        CacheKey::of(&[n])
    }

    #[test]
    fn test_key_is_md5_hex() {
        assert_eq!(
            CacheKey::of(b"").to_hex(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(CacheKey::of(b"abc"), CacheKey::of(b"abc"));
        assert_ne!(CacheKey::of(b"abc"), CacheKey::of(b"abd"));
    }

    #[test]
    fn test_evicts_least_recently_set() {
        let cache = ContentCache::new(2);
        cache.set(key(1), "a").unwrap();
        cache.set(key(2), "b").unwrap();
        cache.set(key(3), "c").unwrap();

        assert_eq!(cache.get(&key(1)).unwrap(), None);
        assert_eq!(cache.get(&key(2)).unwrap(), Some("b"));
        assert_eq!(cache.get(&key(3)).unwrap(), Some("c"));
        assert_eq!(cache.len().unwrap(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ContentCache::new(2);
        cache.set(key(1), "a").unwrap();
        cache.set(key(2), "b").unwrap();
        cache.get(&key(1)).unwrap();
        cache.set(key(3), "c").unwrap();

        assert_eq!(cache.get(&key(1)).unwrap(), Some("a"));
        assert_eq!(cache.get(&key(2)).unwrap(), None);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = ContentCache::new(2);
        cache.set(key(1), "a").unwrap();
        cache.set(key(2), "b").unwrap();
        cache.set(key(1), "a2").unwrap();

        assert_eq!(cache.len().unwrap(), 2);
        assert_eq!(cache.get(&key(1)).unwrap(), Some("a2"));
        assert_eq!(cache.get(&key(2)).unwrap(), Some("b"));

        // key 1 was refreshed by the overwrite, so key 2 goes first
        cache.set(key(1), "a3").unwrap();
        cache.set(key(3), "c").unwrap();
        assert_eq!(cache.get(&key(2)).unwrap(), None);
    }

    #[test]
    fn test_default_capacity() {
        let cache: ContentCache<u32> = ContentCache::default();
        assert_eq!(cache.capacity(), 50);
        for n in 0..=50u8 {
            cache.set(key(n), u32::from(n)).unwrap();
        }
        assert_eq!(cache.len().unwrap(), 50);
        assert_eq!(cache.get(&key(0)).unwrap(), None);
        assert_eq!(cache.get(&key(50)).unwrap(), Some(50));
    }

    #[test]
    fn test_clear() {
        let cache = ContentCache::new(4);
        cache.set(key(1), 1).unwrap();
        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
        assert_eq!(cache.get(&key(1)).unwrap(), None);
        cache.set(key(1), 2).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(2));
    }

    #[test]
    fn test_concurrent_access_stays_consistent() {
        let cache = Arc::new(ContentCache::new(8));
        let handles: Vec<_> = (0..8u8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for n in 0..64u8 {
                        let k = key(n % 12);
                        cache.set(k, (t, n)).unwrap();
                        cache.get(&k).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len().unwrap(), 8);
        let state = cache.lock().unwrap();
        assert_eq!(state.recency.len(), state.entries.len());
        for (tick, k) in &state.recency {
            assert_eq!(state.entries[k].1, *tick);
        }
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let cache = Arc::new(ContentCache::new(2));
        cache.set(key(1), 1).unwrap();

        let holder = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.lock().unwrap();
            panic!("panic while holding the cache lock");
        })
        .join();

        assert!(matches!(cache.len(), Err(CacheError::Poisoned)));
        assert!(matches!(cache.is_empty(), Err(CacheError::Poisoned)));
        assert!(matches!(cache.get(&key(1)), Err(CacheError::Poisoned)));
    }
}
