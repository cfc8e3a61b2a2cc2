//! Dedup Cache (C2): a content-addressed set with per-entry TTL,
//! suppressing re-translation of semantically identical text.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

struct Entry {
    added_at_ms: i64,
    ttl_secs: u64,
}

impl Entry {
    fn is_expired(&self, now_ms: i64) -> bool {
        (now_ms - self.added_at_ms) / 1000 > self.ttl_secs as i64
    }
}

pub struct DedupCache {
    entries: HashMap<String, Entry>,
    default_ttl_secs: u64,
}

/// Trim + lowercase + collapse internal whitespace, matching the
/// normalization rule used by the translation cache key (§3).
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    hex::encode(hasher.finalize())
}

impl DedupCache {
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl_secs,
        }
    }

    /// Inserts `text`'s hash; returns `false` iff it was already present
    /// and unexpired (lazily purging it if expired).
    pub fn add(&mut self, text: &str, now_ms: i64) -> bool {
        let hash = text_hash(text);
        if let Some(entry) = self.entries.get(&hash) {
            if !entry.is_expired(now_ms) {
                return false;
            }
        }
        self.entries.insert(
            hash,
            Entry {
                added_at_ms: now_ms,
                ttl_secs: self.default_ttl_secs,
            },
        );
        true
    }

    pub fn contains(&mut self, text: &str, now_ms: i64) -> bool {
        let hash = text_hash(text);
        match self.entries.get(&hash) {
            Some(entry) if !entry.is_expired(now_ms) => true,
            Some(_) => {
                self.entries.remove(&hash);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_returns_true_for_new_entries() {
        let mut cache = DedupCache::new(10);
        assert!(cache.add("Hello World", 0));
    }

    #[test]
    fn add_returns_false_for_unexpired_duplicate() {
        let mut cache = DedupCache::new(10);
        assert!(cache.add("Hello World", 0));
        assert!(!cache.add("hello   world  ", 1_000));
    }

    #[test]
    fn add_returns_true_after_ttl_expires() {
        let mut cache = DedupCache::new(10);
        assert!(cache.add("Hello World", 0));
        assert!(cache.add("Hello World", 11_000));
    }

    #[test]
    fn contains_lazily_purges_expired_entries() {
        let mut cache = DedupCache::new(10);
        cache.add("Hello World", 0);
        assert!(cache.contains("Hello World", 5_000));
        assert!(!cache.contains("Hello World", 11_000));
    }

    #[test]
    fn normalization_matches_case_and_whitespace_variants() {
        assert_eq!(normalize("  Hello   World  "), "hello world");
        assert_eq!(text_hash("Hello World"), text_hash("  hello world "));
    }
}
