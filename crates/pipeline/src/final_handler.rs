//! Final-Result Handler (C6): the sole forwarding path when partial
//! results are disabled, and the reconciliation point that retires
//! superseded partials and flags large partial/final discrepancies.

use std::sync::Arc;

use relay_core::{EmotionDynamics, FinalResult};
use tracing::warn;

use crate::dedup_cache::DedupCache;
use crate::discrepancy::discrepancy_percent;
use crate::orchestrator::PipelineOrchestrator;
use crate::result_buffer::ResultBuffer;

const SUPERSEDED_WINDOW_MS: i64 = 5_000;
const DISCREPANCY_WARNING_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalOutcome {
    Dropped,
    SuppressedDuplicate,
    Forwarded,
}

pub struct FinalResultHandler {
    dedup: DedupCache,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl FinalResultHandler {
    pub fn new(dedup: DedupCache, orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { dedup, orchestrator }
    }

    pub async fn handle(
        &mut self,
        result: FinalResult,
        buffer: &mut ResultBuffer,
        dynamics: &EmotionDynamics,
        now_ms: i64,
    ) -> FinalOutcome {
        if !result.is_valid() {
            warn!(result_id = %result.result_id, "dropping invalid final result");
            return FinalOutcome::Dropped;
        }

        let superseded = self.take_superseded(&result, buffer);

        if self.dedup.contains(&result.text, now_ms) {
            self.report_discrepancies(&result, &superseded);
            return FinalOutcome::SuppressedDuplicate;
        }
        self.dedup.add(&result.text, now_ms);

        self.orchestrator
            .process_transcript(&result.session_id, &result.source_language, &result.text, dynamics, now_ms)
            .await;

        self.report_discrepancies(&result, &superseded);
        FinalOutcome::Forwarded
    }

    /// Removes buffered partials explicitly named by `replaces_result_ids`,
    /// falling back to a time-window match when none are named.
    fn take_superseded(
        &self,
        result: &FinalResult,
        buffer: &mut ResultBuffer,
    ) -> Vec<relay_core::BufferedResult> {
        if !result.replaces_result_ids.is_empty() {
            return result
                .replaces_result_ids
                .iter()
                .filter_map(|id| buffer.remove_by_id(id))
                .collect();
        }

        let window_start = result.timestamp - SUPERSEDED_WINDOW_MS;
        let ids: Vec<String> = buffer
            .get_all()
            .into_iter()
            .filter(|b| b.result.timestamp >= window_start && b.result.timestamp <= result.timestamp)
            .map(|b| b.result.result_id.clone())
            .collect();

        ids.into_iter().filter_map(|id| buffer.remove_by_id(&id)).collect()
    }

    fn report_discrepancies(&self, result: &FinalResult, superseded: &[relay_core::BufferedResult]) {
        for partial in superseded {
            if !partial.forwarded {
                continue;
            }
            let pct = discrepancy_percent(&partial.result.text, &result.text);
            if pct > DISCREPANCY_WARNING_THRESHOLD {
                warn!(
                    result_id = %result.result_id,
                    partial_text = %partial.result.text,
                    final_text = %result.text,
                    discrepancy_percent = pct,
                    "partial/final text discrepancy above threshold"
                );
            }
        }
    }
}
