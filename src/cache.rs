use crate::config::CacheConfig;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    inserted_at: Instant,
    payload: V,
}

/// Time-bounded response cache with FIFO eviction.
///
/// Expired entries are masked on read, never purged proactively. When the
/// cache grows past its capacity the oldest *inserted* entry is dropped;
/// reads do not refresh an entry's position. Overwriting a key keeps its
/// original slot.
pub struct ResponseCache<V> {
    entries: RwLock<IndexMap<String, CacheEntry<V>>>,
    ttl: Duration,
    capacity: usize,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.capacity)
    }

    /// Cache key for a logical source and the URL it was fetched from
    pub fn key(source: &str, url: &str) -> String {
        format!("{}:{}", source, url)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key.into(), value, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.inserted_at) < self.ttl)
            .map(|entry| entry.payload.clone())
    }

    fn put_at(&self, key: String, value: V, now: Instant) {
        let mut entries = self.entries.write();
        entries.insert(
            key,
            CacheEntry {
                inserted_at: now,
                payload: value,
            },
        );

        if entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_fresh_value() {
        let cache = ResponseCache::default();
        cache.put("kimchi:https://coinpaprika.com", 3.25);
        assert_eq!(cache.get("kimchi:https://coinpaprika.com"), Some(3.25));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_overflow_evicts_first_inserted() {
        let cache = ResponseCache::new(Duration::from_secs(60), 50);
        for i in 0..51 {
            cache.put(format!("key-{}", i), i as f64);
        }

        assert_eq!(cache.len(), 50);
        assert_eq!(cache.get("key-0"), None);
        assert_eq!(cache.get("key-1"), Some(1.0));
        assert_eq!(cache.get("key-50"), Some(50.0));
    }

    #[test]
    fn test_eviction_ignores_reads() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.put("a", 1.0);
        cache.put("b", 2.0);
        // reading "a" must not protect it
        assert_eq!(cache.get("a"), Some(1.0));
        cache.put("c", 3.0);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2.0));
        assert_eq!(cache.get("c"), Some(3.0));
    }

    #[test]
    fn test_overwrite_keeps_insertion_slot() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.put("a", 1.0);
        cache.put("b", 2.0);
        cache.put("a", 10.0);
        cache.put("c", 3.0);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2.0));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60), 50);
        let start = Instant::now();
        cache.put_at("mvrv:page".to_string(), 7.1, start);

        assert_eq!(cache.get_at("mvrv:page", start + Duration::from_secs(59)), Some(7.1));
        assert_eq!(cache.get_at("mvrv:page", start + Duration::from_secs(61)), None);
        // masked, not purged
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_format() {
        assert_eq!(
            ResponseCache::<f64>::key("kimchi", "https://coinpaprika.com/exchanges/bithumb/"),
            "kimchi:https://coinpaprika.com/exchanges/bithumb/"
        );
    }
}
