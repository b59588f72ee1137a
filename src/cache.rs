use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

/// Best-effort read-through cache for listing responses.
///
/// Reads and writes never fail the request: a poisoned lock or a full cache
/// is just a miss. Mutations clear the whole cache rather than tracking
/// which keys a write invalidates.
#[derive(Clone)]
pub enum CacheBackend {
    Disabled,
    Memory(Arc<Mutex<LruCache<String, String>>>),
}

impl CacheBackend {
    pub fn new(capacity: usize) -> Self {
        match NonZeroUsize::new(capacity) {
            Some(cap) => Self::Memory(Arc::new(Mutex::new(LruCache::new(cap)))),
            None => Self::Disabled,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::Memory(cache) => cache.lock().ok()?.get(key).cloned(),
        }
    }

    pub fn put(&self, key: String, value: String) {
        if let Self::Memory(cache) = self
            && let Ok(mut cache) = cache.lock()
        {
            cache.put(key, value);
        }
    }

    pub fn clear(&self) {
        if let Self::Memory(cache) = self
            && let Ok(mut cache) = cache.lock()
        {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backend_always_misses() {
        let cache = CacheBackend::new(0);
        cache.put("k".into(), "v".into());
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn memory_backend_round_trips_and_clears() {
        let cache = CacheBackend::new(4);
        cache.put("k".into(), "v".into());
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        cache.clear();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn memory_backend_evicts_least_recent() {
        let cache = CacheBackend::new(1);
        cache.put("a".into(), "1".into());
        cache.put("b".into(), "2".into());
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b").as_deref(), Some("2"));
    }
}
