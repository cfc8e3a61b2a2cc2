//! Rate Limiter for partial results (C3): a sliding window that admits at
//! most one winner per window, chosen by highest stability (ties broken
//! by most recent timestamp).

use relay_core::PartialResult;

struct Candidate {
    result: PartialResult,
    arrived_at_ms: i64,
}

pub struct RateLimiter {
    window_ms: i64,
    max_per_window: usize,
    window_start_ms: Option<i64>,
    candidates: Vec<Candidate>,
    pub processed: u64,
    pub dropped: u64,
}

impl RateLimiter {
    pub fn new(window_ms: u64, max_per_window: usize) -> Self {
        Self {
            window_ms: window_ms as i64,
            max_per_window,
            window_start_ms: None,
            candidates: Vec::new(),
            processed: 0,
            dropped: 0,
        }
    }

    /// Appends `result` to the current window. Returns `true` if the
    /// window just closed (caller should call `flush_window`).
    pub fn should_process(&mut self, result: PartialResult, now_ms: i64) -> bool {
        let window_start = *self.window_start_ms.get_or_insert(now_ms);

        if now_ms - window_start >= self.window_ms {
            // Previous window closed without an explicit flush; the caller
            // is expected to flush before offering the next candidate, but
            // stay defensive: drop the stale window and start a new one.
            self.candidates.clear();
            self.window_start_ms = Some(now_ms);
        }

        if self.candidates.len() >= self.max_per_window {
            self.dropped += 1;
        }
        self.candidates.push(Candidate {
            result,
            arrived_at_ms: now_ms,
        });

        now_ms - window_start >= self.window_ms
    }

    /// Closes the current window and returns the single best candidate:
    /// highest `stability_score` (`None` treated as `0`), ties broken by
    /// most recent `timestamp`. All other candidates count as dropped.
    pub fn flush_window(&mut self) -> Option<PartialResult> {
        if self.candidates.is_empty() {
            self.window_start_ms = None;
            return None;
        }

        let mut candidates = std::mem::take(&mut self.candidates);
        self.window_start_ms = None;

        candidates.sort_by(|a, b| {
            let sa = a.result.stability_score.unwrap_or(0.0);
            let sb = b.result.stability_score.unwrap_or(0.0);
            sb.partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.result.timestamp.cmp(&a.result.timestamp))
                .then_with(|| b.arrived_at_ms.cmp(&a.arrived_at_ms))
        });

        self.processed += 1;
        self.dropped += (candidates.len() - 1) as u64;

        candidates.into_iter().next().map(|c| c.result)
    }

    pub fn pending_count(&self) -> usize {
        self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(id: &str, ts: i64, stability: Option<f32>) -> PartialResult {
        PartialResult {
            result_id: id.to_string(),
            text: "hi".to_string(),
            timestamp: ts,
            stability_score: stability,
            session_id: "s1".to_string(),
            source_language: "en".to_string(),
        }
    }

    #[test]
    fn flush_picks_highest_stability() {
        let mut rl = RateLimiter::new(200, 5);
        rl.should_process(partial("a", 100, Some(0.5)), 0);
        rl.should_process(partial("b", 200, Some(0.9)), 10);
        rl.should_process(partial("c", 300, Some(0.2)), 20);

        let winner = rl.flush_window().unwrap();
        assert_eq!(winner.result_id, "b");
        assert_eq!(rl.dropped, 2);
        assert_eq!(rl.processed, 1);
    }

    #[test]
    fn ties_broken_by_most_recent_timestamp() {
        let mut rl = RateLimiter::new(200, 5);
        rl.should_process(partial("a", 100, Some(0.9)), 0);
        rl.should_process(partial("b", 300, Some(0.9)), 10);

        let winner = rl.flush_window().unwrap();
        assert_eq!(winner.result_id, "b");
    }

    #[test]
    fn none_stability_treated_as_zero() {
        let mut rl = RateLimiter::new(200, 5);
        rl.should_process(partial("a", 100, None), 0);
        rl.should_process(partial("b", 200, Some(0.01)), 10);

        let winner = rl.flush_window().unwrap();
        assert_eq!(winner.result_id, "b");
    }

    #[test]
    fn caps_at_n_candidates_best_of_window_over_twenty() {
        let mut rl = RateLimiter::new(1000, 5);
        for i in 0..20 {
            rl.should_process(partial(&format!("r{i}"), i as i64, Some(i as f32 / 20.0)), i as i64);
        }
        let winner = rl.flush_window().unwrap();
        assert_eq!(winner.result_id, "r19");
        assert_eq!(rl.processed, 1);
        assert_eq!(rl.dropped, 19);
    }

    #[test]
    fn flush_on_empty_window_returns_none() {
        let mut rl = RateLimiter::new(200, 5);
        assert!(rl.flush_window().is_none());
    }
}
