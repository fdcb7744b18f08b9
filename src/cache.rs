//! Byte-bounded LRU cache over serialized search results.
//!
//! Values are the exact JSON payloads the HTTP layer streams back, so a hit
//! bypasses the engine and the serializer entirely. Only searches slow
//! enough to be worth remembering get stored; the serve layer measures that
//! against [`POPULATE_THRESHOLD`] on a monotonic clock.

use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;

use crate::model::PageId;

/// Minimum uncached search duration before the result is worth caching.
pub const POPULATE_THRESHOLD: Duration = Duration::from_secs(2);

/// Cache key. The language code keeps stores of different editions apart
/// even when page ids collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub language_code: String,
    pub source: PageId,
    pub target: PageId,
}

pub struct SearchCache {
    inner: Mutex<Inner>,
}

struct Inner {
    entries: LruCache<SearchKey, Vec<u8>>,
    current_bytes: usize,
    max_bytes: usize,
}

impl SearchCache {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                current_bytes: 0,
                max_bytes,
            }),
        }
    }

    /// Return the cached payload verbatim, refreshing its recency.
    pub fn fetch(&self, key: &SearchKey) -> Option<Vec<u8>> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Insert a payload. A duplicate key is a no-op. Inserting may evict any
    /// number of least-recently-used entries, including the new one when it
    /// alone exceeds the budget.
    pub fn store(&self, key: SearchKey, payload: Vec<u8>) {
        let mut inner = self.inner.lock();
        if inner.entries.contains(&key) {
            return;
        }
        inner.current_bytes += payload.len();
        inner.entries.push(key, payload);
        while inner.current_bytes > inner.max_bytes {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.current_bytes -= evicted.len(),
                None => break,
            }
        }
    }

    pub fn current_bytes(&self) -> usize {
        self.inner.lock().current_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(language_code: &str, source: PageId, target: PageId) -> SearchKey {
        SearchKey {
            language_code: language_code.to_owned(),
            source,
            target,
        }
    }

    #[test]
    fn fetch_returns_payload_verbatim() {
        let cache = SearchCache::new(1024);
        cache.store(key("en", 1, 2), b"payload".to_vec());
        assert_eq!(cache.fetch(&key("en", 1, 2)), Some(b"payload".to_vec()));
        assert_eq!(cache.fetch(&key("en", 2, 1)), None);
    }

    #[test]
    fn duplicate_store_is_a_no_op() {
        let cache = SearchCache::new(1024);
        cache.store(key("en", 1, 2), b"first".to_vec());
        cache.store(key("en", 1, 2), b"second".to_vec());
        assert_eq!(cache.fetch(&key("en", 1, 2)), Some(b"first".to_vec()));
        assert_eq!(cache.current_bytes(), 5);
    }

    #[test]
    fn language_codes_do_not_collide() {
        let cache = SearchCache::new(1024);
        cache.store(key("en", 1, 2), b"english".to_vec());
        cache.store(key("de", 1, 2), b"german".to_vec());
        assert_eq!(cache.fetch(&key("en", 1, 2)), Some(b"english".to_vec()));
        assert_eq!(cache.fetch(&key("de", 1, 2)), Some(b"german".to_vec()));
    }

    #[test]
    fn eviction_starts_at_the_oldest_entry() {
        let cache = SearchCache::new(10);
        cache.store(key("en", 1, 2), vec![0; 4]);
        cache.store(key("en", 3, 4), vec![0; 4]);
        // 4 + 4 + 4 > 10: the first insert goes.
        cache.store(key("en", 5, 6), vec![0; 4]);
        assert_eq!(cache.fetch(&key("en", 1, 2)), None);
        assert!(cache.fetch(&key("en", 3, 4)).is_some());
        assert!(cache.fetch(&key("en", 5, 6)).is_some());
        assert_eq!(cache.current_bytes(), 8);
    }

    #[test]
    fn one_insert_may_evict_many() {
        let cache = SearchCache::new(10);
        cache.store(key("en", 1, 2), vec![0; 4]);
        cache.store(key("en", 3, 4), vec![0; 4]);
        cache.store(key("en", 5, 6), vec![0; 10]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.current_bytes(), 10);
    }

    #[test]
    fn oversized_payload_leaves_the_cache_empty() {
        let cache = SearchCache::new(10);
        cache.store(key("en", 1, 2), vec![0; 4]);
        cache.store(key("en", 3, 4), vec![0; 32]);
        assert!(cache.is_empty());
        assert_eq!(cache.current_bytes(), 0);
    }

    #[test]
    fn fetch_refreshes_recency() {
        let cache = SearchCache::new(8);
        cache.store(key("en", 1, 2), vec![0; 4]);
        cache.store(key("en", 3, 4), vec![0; 4]);
        // Touch the older entry, then force one eviction.
        assert!(cache.fetch(&key("en", 1, 2)).is_some());
        cache.store(key("en", 5, 6), vec![0; 4]);
        assert!(cache.fetch(&key("en", 1, 2)).is_some());
        assert_eq!(cache.fetch(&key("en", 3, 4)), None);
    }

    proptest! {
        /// After any operation sequence the byte counter equals the sum of
        /// the resident payload lengths and never exceeds the budget.
        #[test]
        fn byte_accounting_law(
            max_bytes in 1usize..64,
            ops in proptest::collection::vec(
                (0u8..2, 0u32..8, 0u32..8, 0usize..24),
                1..64,
            ),
        ) {
            let cache = SearchCache::new(max_bytes);
            let mut model: std::collections::HashMap<(u32, u32), usize> =
                std::collections::HashMap::new();

            for (op, source, target, len) in ops {
                let k = key("en", source, target);
                if op == 0 {
                    cache.store(k, vec![0; len]);
                } else {
                    let _ = cache.fetch(&k);
                }
            }

            // Re-derive the resident set through fetches: every fetchable
            // payload contributes its length exactly once.
            for source in 0u32..8 {
                for target in 0u32..8 {
                    if let Some(payload) = cache.fetch(&key("en", source, target)) {
                        model.insert((source, target), payload.len());
                    }
                }
            }
            prop_assert_eq!(cache.current_bytes(), model.values().sum::<usize>());
            prop_assert!(cache.current_bytes() <= max_bytes);
        }
    }
}
