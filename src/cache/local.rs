// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local cache tier.
//!
//! In-memory map behind a reader/writer lock. Every entry carries an
//! absolute expiry; reads evict lazily, so the map never needs a sweeper
//! task. Readers proceed concurrently, writers are exclusive.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct LocalCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> LocalCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a key, lazily evicting it if expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let expired = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if Instant::now() < entry.expires_at => {
                    return Some(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.entries.write().remove(key);
        }
        None
    }

    pub fn set(&self, key: &str, value: V) {
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let cache = LocalCache::new(Duration::from_secs(60));
        cache.set("k", 42);
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let cache: LocalCache<u32> = LocalCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = LocalCache::new(Duration::from_millis(0));
        cache.set("k", 42);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        // Lazy eviction removed the entry.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_delete() {
        let cache = LocalCache::new(Duration::from_secs(60));
        cache.set("k", 1);
        cache.delete("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_clear_empties_every_key() {
        let cache = LocalCache::new(Duration::from_secs(60));
        for i in 0..10 {
            cache.set(&format!("k{i}"), i);
        }
        assert_eq!(cache.len(), 10);
        cache.clear();
        assert!(cache.is_empty());
        for i in 0..10 {
            assert_eq!(cache.get(&format!("k{i}")), None);
        }
    }

    #[test]
    fn test_set_overwrites_and_refreshes() {
        let cache = LocalCache::new(Duration::from_secs(60));
        cache.set("k", 1);
        cache.set("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
