// Profile Cache
// Content-addressed LRU + TTL memoization of stylometric profiles, backed by
// moka. Shared across concurrent runs; pending evictions are flushed after
// every write so the entry count never exceeds capacity.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use crate::models::StylometricProfile;
use crate::services::text_processor::normalize_whitespace;

pub const DEFAULT_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

pub struct ProfileCache {
    capacity: usize,
    entries: Cache<String, Arc<StylometricProfile>>,
}

impl fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileCache")
            .field("capacity", &self.capacity)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

/// xxh64 of the whitespace-normalized text, suffixed with its length.
pub fn cache_key(text: &str) -> String {
    let normalized = normalize_whitespace(text);
    format!("{:016x}:{}", xxh64(normalized.as_bytes(), 0), normalized.len())
}

impl ProfileCache {
    /// A capacity of zero is bumped to one so `set` followed by `get` still hits.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        let entries = Cache::<String, Arc<StylometricProfile>>::builder()
            .max_capacity(capacity as u64)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(|key: Arc<String>, _profile: Arc<StylometricProfile>, cause: RemovalCause| {
                if cause.was_evicted() {
                    debug!(key = %key, cause = ?cause, "[STYLOMETRY] cache entry evicted");
                }
            })
            .build();
        Self { capacity, entries }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Expired entries read as absent.
    pub fn get(&self, text: &str) -> Option<Arc<StylometricProfile>> {
        self.entries.get(&cache_key(text))
    }

    pub fn set(&self, text: &str, profile: Arc<StylometricProfile>) {
        self.entries.insert(cache_key(text), profile);
        self.entries.run_pending_tasks();
    }

    /// Return the cached profile or compute, store and return a new one.
    /// Concurrent callers for the same text share one computation.
    pub fn get_or_compute<F>(&self, text: &str, compute: F) -> Arc<StylometricProfile>
    where
        F: FnOnce(&str) -> StylometricProfile,
    {
        let profile = self
            .entries
            .get_with(cache_key(text), || Arc::new(compute(text)));
        self.entries.run_pending_tasks();
        profile
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(words: usize) -> Arc<StylometricProfile> {
        Arc::new(StylometricProfile {
            word_count: words,
            ..Default::default()
        })
    }

    #[test]
    fn test_get_is_reference_stable() {
        let cache = ProfileCache::default();
        cache.set("some text", profile(2));
        let a = cache.get("some text").unwrap();
        let b = cache.get("some text").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_miss_returns_none() {
        let cache = ProfileCache::default();
        assert!(cache.get("never stored").is_none());
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let cache = ProfileCache::new(5, DEFAULT_CACHE_TTL);
        for i in 0..50 {
            cache.set(&format!("text number {}", i), profile(i));
            assert!(cache.len() <= 5);
        }
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ProfileCache::new(2, DEFAULT_CACHE_TTL);
        cache.set("first", profile(1));
        std::thread::sleep(Duration::from_millis(2));
        cache.set("second", profile(2));
        std::thread::sleep(Duration::from_millis(2));
        // Touch "first" so "second" becomes the oldest access.
        assert!(cache.get("first").is_some());
        std::thread::sleep(Duration::from_millis(2));
        cache.set("third", profile(3));

        assert!(cache.get("first").is_some());
        assert!(cache.get("second").is_none());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_expired_entries_are_removed_on_get() {
        let cache = ProfileCache::new(10, Duration::from_millis(1));
        cache.set("short lived", profile(2));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("short lived").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_key_ignores_whitespace_layout() {
        assert_eq!(cache_key("a  b\n"), cache_key(" a b"));
        assert_ne!(cache_key("a b"), cache_key("a c"));
    }

    #[test]
    fn test_key_is_content_hash_and_length() {
        let key = cache_key("  hello   world ");
        let expected = format!("{:016x}:11", xxh64(b"hello world", 0));
        assert_eq!(key, expected);
    }

    #[test]
    fn test_get_or_compute_stays_within_capacity() {
        let cache = ProfileCache::new(3, DEFAULT_CACHE_TTL);
        for i in 0..20 {
            cache.get_or_compute(&format!("computed text {}", i), |_| StylometricProfile::default());
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn test_get_or_compute_runs_once() {
        let cache = ProfileCache::default();
        let mut calls = 0;
        let first = cache.get_or_compute("abc", |_| {
            calls += 1;
            StylometricProfile::default()
        });
        let second = cache.get_or_compute("abc", |_| unreachable!("cached"));
        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_clear() {
        let cache = ProfileCache::default();
        cache.set("x", profile(1));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ProfileCache::new(8, DEFAULT_CACHE_TTL));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let text = format!("thread {} item {}", t, i % 12);
                        cache.get_or_compute(&text, |_| StylometricProfile::default());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 8);
    }
}
