//! Translation Cache (C7): persistent key→value store with LRU-by-access
//! eviction and hit/miss metrics.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::dedup_cache::normalize;

#[derive(Debug, Clone)]
struct CacheEntry {
    translated_text: String,
    access_count: u64,
    last_accessed_at_ms: i64,
    created_at_ms: i64,
    ttl_secs: u64,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        (now_ms - self.created_at_ms) / 1000 > self.ttl_secs as i64
    }
}

pub struct TranslationCache {
    entries: HashMap<String, CacheEntry>,
    max_entries: usize,
    default_ttl_secs: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// `cacheKey = source:target:firstSixteenHexOfHash(normalize(text))`.
pub fn cache_key(source: &str, target: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    let digest = hasher.finalize();
    let hex = hex::encode(digest);
    format!("{source}:{target}:{}", &hex[..16])
}

impl TranslationCache {
    pub fn new(max_entries: usize, default_ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            default_ttl_secs,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn get(&mut self, source: &str, target: &str, text: &str, now_ms: i64) -> Option<String> {
        let key = cache_key(source, target, text);
        let expired = matches!(self.entries.get(&key), Some(e) if e.is_expired(now_ms));
        if expired {
            self.entries.remove(&key);
        }
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.access_count += 1;
                entry.last_accessed_at_ms = now_ms;
                self.hits += 1;
                Some(entry.translated_text.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, source: &str, target: &str, text: &str, translation: String, now_ms: i64) {
        let key = cache_key(source, target, text);
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_one();
        }
        self.entries.insert(
            key,
            CacheEntry {
                translated_text: translation,
                access_count: 0,
                last_accessed_at_ms: now_ms,
                created_at_ms: now_ms,
                ttl_secs: self.default_ttl_secs,
            },
        );
    }

    /// Evicts the entry with the lowest `access_count`, ties broken by the
    /// oldest `last_accessed_at_ms`.
    fn evict_one(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.access_count
                    .cmp(&b.access_count)
                    .then_with(|| a.last_accessed_at_ms.cmp(&b.last_accessed_at_ms))
            })
            .map(|(k, _)| k.clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_across_case_and_whitespace() {
        let k1 = cache_key("en", "es", "Hello World");
        let k2 = cache_key("en", "es", "  hello   world ");
        assert_eq!(k1, k2);
    }

    #[test]
    fn cache_key_differs_by_target_or_text() {
        let k1 = cache_key("en", "es", "Hello");
        let k2 = cache_key("en", "fr", "Hello");
        let k3 = cache_key("en", "es", "Goodbye");
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn put_then_get_hits() {
        let mut cache = TranslationCache::new(10, 3600);
        cache.put("en", "es", "Hello", "Hola".to_string(), 0);
        assert_eq!(cache.get("en", "es", "Hello", 10), Some("Hola".to_string()));
    }

    #[test]
    fn hit_rate_tracks_hits_and_misses() {
        let mut cache = TranslationCache::new(10, 3600);
        assert!(cache.get("en", "es", "Hello", 0).is_none());
        cache.put("en", "es", "Hello", "Hola".to_string(), 0);
        assert!(cache.get("en", "es", "Hello", 0).is_some());
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn expired_entries_are_treated_as_misses() {
        let mut cache = TranslationCache::new(10, 10);
        cache.put("en", "es", "Hello", "Hola".to_string(), 0);
        assert!(cache.get("en", "es", "Hello", 11_000).is_none());
    }

    #[test]
    fn eviction_prefers_lowest_access_count_then_oldest() {
        let mut cache = TranslationCache::new(2, 3600);
        cache.put("en", "es", "A", "a".to_string(), 0);
        cache.put("en", "es", "B", "b".to_string(), 10);
        // Access "A" once so "B" has the lowest access count.
        cache.get("en", "es", "A", 20);
        cache.put("en", "es", "C", "c".to_string(), 30);

        assert!(cache.get("en", "es", "B", 40).is_none());
        assert!(cache.get("en", "es", "A", 40).is_some());
        assert!(cache.get("en", "es", "C", 40).is_some());
        assert_eq!(cache.evictions(), 1);
    }
}
