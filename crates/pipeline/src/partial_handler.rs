//! Partial-Result Handler (C5): per-session decision logic for whether an
//! arriving partial transcript buffers, forwards, or is deferred to the
//! rate-limiter window.
//!
//! One handler instance owns one session's stream; callers are expected to
//! serialize calls per session (§5 concurrency model).

use std::sync::Arc;

use relay_core::{BufferedResult, EmotionDynamics, PartialResult};
use tracing::{debug, warn};

use crate::dedup_cache::DedupCache;
use crate::orchestrator::PipelineOrchestrator;
use crate::rate_limiter::RateLimiter;
use crate::result_buffer::ResultBuffer;
use crate::sentence_boundary::SentenceBoundaryDetector;

pub struct PartialResultHandler {
    buffer: ResultBuffer,
    dedup: DedupCache,
    rate_limiter: RateLimiter,
    sentence_detector: SentenceBoundaryDetector,
    min_stability_threshold: f32,
    orchestrator: Arc<PipelineOrchestrator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialOutcome {
    Dropped,
    Buffered,
    Forwarded,
    SuppressedDuplicate,
    DeferredToRateLimiter,
}

impl PartialResultHandler {
    pub fn new(
        buffer: ResultBuffer,
        dedup: DedupCache,
        rate_limiter: RateLimiter,
        sentence_detector: SentenceBoundaryDetector,
        min_stability_threshold: f32,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> Self {
        Self {
            buffer,
            dedup,
            rate_limiter,
            sentence_detector,
            min_stability_threshold,
            orchestrator,
        }
    }

    /// Exposes the shared buffer so a final result can reconcile against
    /// the same partials this handler has been accumulating (§4.6).
    pub fn buffer_mut(&mut self) -> &mut ResultBuffer {
        &mut self.buffer
    }

    pub async fn handle(
        &mut self,
        result: PartialResult,
        source_language: &str,
        dynamics: &EmotionDynamics,
        now_ms: i64,
    ) -> PartialOutcome {
        if result.text.trim().is_empty() {
            warn!(result_id = %result.result_id, "dropping empty partial result");
            return PartialOutcome::Dropped;
        }

        let existing = self.buffer.get_by_id(&result.result_id).cloned();
        if existing.is_none() {
            self.buffer.add(BufferedResult::new(result.clone(), now_ms));
        }
        let buffered = self.buffer.get_by_id(&result.result_id);

        let complete = self
            .sentence_detector
            .is_complete_sentence(&result, false, buffered, now_ms);

        let meets_threshold = match result.stability_score {
            Some(score) => score >= self.min_stability_threshold,
            None => true,
        };

        if !complete {
            debug!(result_id = %result.result_id, "buffering, not yet a complete sentence");
            return PartialOutcome::Buffered;
        }
        if !meets_threshold {
            debug!(result_id = %result.result_id, "buffering, below stability threshold");
            return PartialOutcome::Buffered;
        }

        if self.rate_limiter.should_process(result.clone(), now_ms) {
            match self.rate_limiter.flush_window() {
                Some(winner) => self.forward(winner, source_language, dynamics, now_ms).await,
                None => PartialOutcome::DeferredToRateLimiter,
            }
        } else {
            PartialOutcome::DeferredToRateLimiter
        }
    }

    async fn forward(
        &mut self,
        result: PartialResult,
        source_language: &str,
        dynamics: &EmotionDynamics,
        now_ms: i64,
    ) -> PartialOutcome {
        if self.dedup.contains(&result.text, now_ms) {
            return PartialOutcome::SuppressedDuplicate;
        }
        self.dedup.add(&result.text, now_ms);

        self.orchestrator
            .process_transcript(&result.session_id, source_language, &result.text, dynamics, now_ms)
            .await;

        self.buffer.mark_forwarded(&result.result_id);
        self.sentence_detector.mark_forwarded_at(result.timestamp);
        PartialOutcome::Forwarded
    }
}
