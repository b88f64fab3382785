//! Bounded, TTL-expiring, FIFO-by-creation cache — used by the webfetch tool.
//!
//! Grounded on `scan_cache`'s TTL-expiry idiom, reshaped from disk-persisted/
//! content-hash-keyed to in-memory/fixed-capacity/FIFO eviction per the spec.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    created_at: Instant,
    seq: u64,
}

/// Fixed-capacity, TTL-expiring cache. `Get` lazily deletes expired entries;
/// `Set` evicts the oldest-*created* entry on overflow (explicit FIFO, not LRU).
pub struct TtlCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
    next_seq: Mutex<u64>,
}

impl TtlCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
            next_seq: Mutex::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(e) if e.created_at.elapsed() < self.ttl => Some(e.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: String, value: String) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }
        let seq = {
            let mut next = self.next_seq.lock().unwrap();
            let s = *next;
            *next += 1;
            s
        };
        entries.insert(
            key,
            Entry {
                value,
                created_at: Instant::now(),
                seq,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_capacity() {
        let cache = TtlCache::new(3, Duration::from_secs(60));
        for i in 0..10 {
            cache.set(format!("k{i}"), format!("v{i}"));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn evicts_oldest_created_not_most_recently_used() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.set("a".into(), "1".into());
        cache.set("b".into(), "2".into());
        // Touching "a" via get() must not protect it from FIFO eviction.
        let _ = cache.get("a");
        cache.set("c".into(), "3".into());
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn expired_entry_is_lazily_removed() {
        let cache = TtlCache::new(10, Duration::from_millis(10));
        cache.set("k".into(), "v".into());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("k").is_none());
    }
}
