//! Capacity-bounded least-recently-used cache.

use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Capacity used when zero is requested.
pub const DEFAULT_CAPACITY: usize = 128;

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CAPACITY) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Checks that a stored value still belongs to its key.
pub type Validator<K, V> = fn(&K, &V) -> bool;

/// Thread-safe LRU cache with an optional shape check on hits.
///
/// A hit that fails the validator is evicted and reported as a miss.
pub struct RecencyCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
    validator: Option<Validator<K, V>>,
}

impl<K: Hash + Eq, V: Clone> RecencyCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            validator: None,
        }
    }

    pub fn with_validator(capacity: usize, validator: Validator<K, V>) -> Self {
        Self {
            validator: Some(validator),
            ..Self::new(capacity)
        }
    }

    /// Value for `key`, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock();
        let value = cache.get(key)?.clone();

        match self.validator {
            Some(valid) if !valid(key, &value) => {
                cache.pop(key);
                tracing::warn!("Evicted cache entry that does not match its key");
                None
            }
            _ => Some(value),
        }
    }

    /// Insert or replace, evicting the least recently used entry when full.
    pub fn set(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    pub fn delete(&self, key: &K) -> Option<V> {
        self.inner.lock().pop(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = RecencyCache::new(2);
        cache.set(1, "one");
        cache.set(2, "two");

        // Touch 1 so 2 becomes the eviction candidate.
        assert_eq!(cache.get(&1), Some("one"));
        cache.set(3, "three");

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("one"));
        assert_eq!(cache.get(&3), Some("three"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        let cache: RecencyCache<u8, u8> = RecencyCache::new(0);
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_validator_evicts_mismatched_value() {
        let cache = RecencyCache::with_validator(4, |k: &u32, v: &(u32, u32)| *k == v.0);
        cache.set(1, (1, 100));
        cache.set(2, (9, 200));

        assert_eq!(cache.get(&1), Some((1, 100)));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = RecencyCache::new(4);
        cache.set("a", 1);
        cache.set("b", 2);

        assert_eq!(cache.delete(&"a"), Some(1));
        assert_eq!(cache.delete(&"a"), None);
        cache.clear();
        assert!(cache.is_empty());
    }
}
