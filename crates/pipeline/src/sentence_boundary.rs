//! Sentence Boundary Detector (C4): heuristic for "ready to forward",
//! based on punctuation, pauses, and buffer timeouts.

use relay_core::{BufferedResult, PartialResult};

const SENTENCE_TERMINATORS: &[char] = &['.', '?', '!', '。', '？', '！'];

pub struct SentenceBoundaryDetector {
    pub pause_threshold_secs: u64,
    pub max_buffer_timeout_secs: u64,
    /// Milliseconds since epoch of the last *forwarded* result on this
    /// session, used to detect a pause since then.
    pub last_result_time_ms: Option<i64>,
}

impl SentenceBoundaryDetector {
    pub fn new(pause_threshold_secs: u64, max_buffer_timeout_secs: u64) -> Self {
        Self {
            pause_threshold_secs,
            max_buffer_timeout_secs,
            last_result_time_ms: None,
        }
    }

    pub fn ends_with_terminator(text: &str) -> bool {
        text.trim_end()
            .chars()
            .next_back()
            .is_some_and(|c| SENTENCE_TERMINATORS.contains(&c))
    }

    pub fn is_complete_sentence(
        &self,
        result: &PartialResult,
        is_final: bool,
        buffered: Option<&BufferedResult>,
        now_ms: i64,
    ) -> bool {
        if is_final {
            return true;
        }
        if Self::ends_with_terminator(&result.text) {
            return true;
        }
        if let Some(last) = self.last_result_time_ms {
            if (now_ms - last) / 1000 >= self.pause_threshold_secs as i64 {
                return true;
            }
        }
        if let Some(buffered) = buffered {
            if buffered.age_secs(now_ms) >= self.max_buffer_timeout_secs as f64 {
                return true;
            }
            if result.stability_score.is_none() && buffered.age_secs(now_ms) >= 3.0 {
                return true;
            }
        }
        false
    }

    pub fn mark_forwarded_at(&mut self, timestamp_ms: i64) {
        self.last_result_time_ms = Some(timestamp_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str, stability: Option<f32>) -> PartialResult {
        PartialResult {
            result_id: "r1".to_string(),
            text: text.to_string(),
            timestamp: 1_000,
            stability_score: stability,
            session_id: "s1".to_string(),
            source_language: "en".to_string(),
        }
    }

    #[test]
    fn final_is_always_complete() {
        let det = SentenceBoundaryDetector::new(2, 5);
        assert!(det.is_complete_sentence(&result("no punctuation", Some(0.5)), true, None, 0));
    }

    #[test]
    fn terminating_punctuation_is_complete() {
        let det = SentenceBoundaryDetector::new(2, 5);
        assert!(det.is_complete_sentence(&result("Done.", Some(0.5)), false, None, 0));
        assert!(det.is_complete_sentence(&result("真的吗？", Some(0.5)), false, None, 0));
        assert!(!det.is_complete_sentence(&result("not done", Some(0.5)), false, None, 0));
    }

    #[test]
    fn pause_since_last_forward_triggers_complete() {
        let mut det = SentenceBoundaryDetector::new(2, 5);
        det.mark_forwarded_at(0);
        assert!(!det.is_complete_sentence(&result("still going", Some(0.5)), false, None, 1_000));
        assert!(det.is_complete_sentence(&result("still going", Some(0.5)), false, None, 2_500));
    }

    #[test]
    fn buffer_timeout_triggers_complete() {
        let det = SentenceBoundaryDetector::new(2, 5);
        let buffered = relay_core::BufferedResult::new(result("still going", Some(0.5)), 0);
        assert!(!det.is_complete_sentence(&result("still going", Some(0.5)), false, Some(&buffered), 4_000));
        assert!(det.is_complete_sentence(&result("still going", Some(0.5)), false, Some(&buffered), 5_500));
    }

    #[test]
    fn missing_stability_falls_back_after_three_seconds_buffered() {
        let det = SentenceBoundaryDetector::new(2, 10);
        let buffered = relay_core::BufferedResult::new(result("still going", None), 0);
        assert!(!det.is_complete_sentence(&result("still going", None), false, Some(&buffered), 2_000));
        assert!(det.is_complete_sentence(&result("still going", None), false, Some(&buffered), 3_500));
    }
}
