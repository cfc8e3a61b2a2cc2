//! Result Buffer (C1): ordered store of in-flight partial results for one
//! session, with a capacity bound expressed in seconds of speech and
//! orphan detection.

use std::collections::HashMap;

use relay_core::BufferedResult;

pub struct ResultBuffer {
    entries: HashMap<String, BufferedResult>,
    /// Capacity in number of buffered entries, derived from
    /// `capacity_secs * words_per_second` at construction (the spec
    /// expresses capacity in seconds of speech; we bound on entry count
    /// since each entry is one ASR hypothesis, not one word).
    capacity: usize,
    /// Stability score an un-forwarded entry must meet to be evicted under
    /// capacity pressure, alongside already-forwarded entries (§4.1).
    min_stability_threshold: f32,
}

impl ResultBuffer {
    pub fn new(capacity_secs: u64, words_per_second: u32, min_stability_threshold: f32) -> Self {
        let capacity = (capacity_secs as u64 * words_per_second as u64).max(1) as usize;
        Self {
            entries: HashMap::new(),
            capacity,
            min_stability_threshold,
        }
    }

    pub fn add(&mut self, buffered: BufferedResult) {
        if self.entries.len() >= self.capacity {
            self.evict_one();
        }
        self.entries.insert(buffered.result.result_id.clone(), buffered);
    }

    pub fn remove_by_id(&mut self, result_id: &str) -> Option<BufferedResult> {
        self.entries.remove(result_id)
    }

    pub fn get_by_id(&self, result_id: &str) -> Option<&BufferedResult> {
        self.entries.get(result_id)
    }

    pub fn get_all(&self) -> Vec<&BufferedResult> {
        self.entries.values().collect()
    }

    pub fn sort_by_timestamp(&self) -> Vec<&BufferedResult> {
        let mut all: Vec<&BufferedResult> = self.entries.values().collect();
        all.sort_by_key(|b| b.result.timestamp);
        all
    }

    pub fn mark_forwarded(&mut self, result_id: &str) {
        if let Some(entry) = self.entries.get_mut(result_id) {
            entry.forwarded = true;
        }
    }

    /// Entries older than `timeout_secs` (by `added_at_ms`) that have not
    /// been forwarded — the orphan-flush candidates.
    pub fn get_orphaned(&self, timeout_secs: u64, now_ms: i64) -> Vec<&BufferedResult> {
        self.entries
            .values()
            .filter(|b| !b.forwarded && b.age_secs(now_ms) >= timeout_secs as f64)
            .collect()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evict the single oldest entry that is either forwarded or stable
    /// enough (`None` stability counts as stable). Never evicts an
    /// un-forwarded, low-stability partial — the orphan path is the only
    /// thing allowed to remove those, per §4.1.
    fn evict_one(&mut self) {
        let victim_id = self
            .entries
            .values()
            .filter(|b| {
                b.forwarded
                    || b.result
                        .stability_score
                        .map_or(true, |s| s >= self.min_stability_threshold)
            })
            .min_by_key(|b| b.result.timestamp)
            .map(|b| b.result.result_id.clone());

        if let Some(id) = victim_id {
            self.entries.remove(&id);
        }
        // If nothing qualifies for eviction (everything un-forwarded and
        // low-stability), the buffer is simply allowed to exceed capacity
        // by one until the orphan sweep or a forward frees space.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::PartialResult;

    fn partial(id: &str, ts: i64, stability: Option<f32>) -> PartialResult {
        PartialResult {
            result_id: id.to_string(),
            text: "hello".to_string(),
            timestamp: ts,
            stability_score: stability,
            session_id: "s1".to_string(),
            source_language: "en".to_string(),
        }
    }

    #[test]
    fn sort_by_timestamp_is_ascending_regardless_of_insertion_order() {
        let mut buf = ResultBuffer::new(300, 30, 0.85);
        buf.add(BufferedResult::new(partial("b", 200, Some(0.5)), 1000));
        buf.add(BufferedResult::new(partial("a", 100, Some(0.5)), 1000));
        buf.add(BufferedResult::new(partial("c", 300, Some(0.5)), 1000));

        let sorted = buf.sort_by_timestamp();
        let ids: Vec<&str> = sorted.iter().map(|b| b.result.result_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn orphan_detection_respects_timeout() {
        let mut buf = ResultBuffer::new(300, 30, 0.85);
        buf.add(BufferedResult::new(partial("a", 100, Some(0.5)), 0));

        assert!(buf.get_orphaned(15, 10_000).is_empty());
        assert_eq!(buf.get_orphaned(15, 16_000).len(), 1);
    }

    #[test]
    fn mark_forwarded_flips_flag() {
        let mut buf = ResultBuffer::new(300, 30, 0.85);
        buf.add(BufferedResult::new(partial("a", 100, Some(0.5)), 0));
        buf.mark_forwarded("a");
        assert!(buf.get_by_id("a").unwrap().forwarded);
    }

    #[test]
    fn capacity_eviction_prefers_forwarded_or_stable_oldest() {
        let mut buf = ResultBuffer::new(0, 1, 0.85); // capacity == 1
        buf.add(BufferedResult::new(partial("a", 100, None), 0));
        // "a" has stability None (counts stable), so it's evictable.
        buf.add(BufferedResult::new(partial("b", 200, Some(0.9)), 0));
        assert_eq!(buf.size(), 1);
        assert!(buf.get_by_id("a").is_none());
        assert!(buf.get_by_id("b").is_some());
    }

    #[test]
    fn capacity_eviction_respects_stability_threshold() {
        let mut buf = ResultBuffer::new(0, 1, 0.85); // capacity == 1
        buf.add(BufferedResult::new(partial("a", 100, Some(0.5)), 0));
        // "a" is below the 0.85 threshold and un-forwarded, so it is not
        // evictable; the buffer is allowed to exceed capacity by one.
        buf.add(BufferedResult::new(partial("b", 200, Some(0.9)), 0));
        assert_eq!(buf.size(), 2);
        assert!(buf.get_by_id("a").is_some());
        assert!(buf.get_by_id("b").is_some());
    }

    #[test]
    fn remove_by_id_and_clear() {
        let mut buf = ResultBuffer::new(300, 30, 0.85);
        buf.add(BufferedResult::new(partial("a", 100, Some(0.5)), 0));
        assert!(buf.remove_by_id("a").is_some());
        assert!(buf.get_by_id("a").is_none());

        buf.add(BufferedResult::new(partial("b", 100, Some(0.5)), 0));
        buf.clear();
        assert_eq!(buf.size(), 0);
    }
}
