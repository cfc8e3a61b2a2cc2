//! ASR result types: partial/final transcripts and the buffered in-flight
//! state the result buffer (C1) tracks between them (§3, §4.1).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialResult {
    pub result_id: String,
    pub text: String,
    /// Milliseconds since epoch, ASR-reported.
    pub timestamp: i64,
    /// `None` is distinct from a zero score — the ASR backend simply did
    /// not report a confidence for this hypothesis.
    pub stability_score: Option<f32>,
    pub session_id: String,
    pub source_language: String,
}

impl PartialResult {
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty() && !self.result_id.is_empty() && self.timestamp > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    pub result_id: String,
    pub text: String,
    pub timestamp: i64,
    pub session_id: String,
    pub source_language: String,
    #[serde(default)]
    pub replaces_result_ids: Vec<String>,
}

impl FinalResult {
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty() && !self.result_id.is_empty() && self.timestamp > 0
    }
}

/// The result buffer's bookkeeping wrapper around a partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferedResult {
    pub result: PartialResult,
    /// Milliseconds since epoch, when this entry was first buffered.
    pub added_at_ms: i64,
    pub forwarded: bool,
}

impl BufferedResult {
    pub fn new(result: PartialResult, added_at_ms: i64) -> Self {
        Self {
            result,
            added_at_ms,
            forwarded: false,
        }
    }

    pub fn age_secs(&self, now_ms: i64) -> f64 {
        (now_ms - self.added_at_ms).max(0) as f64 / 1000.0
    }
}

/// Metadata describing a downstream forward decision, carried alongside a
/// forwarded text for logging/metrics purposes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResultMetadata {
    pub was_partial: bool,
    pub stability_score: Option<f32>,
    pub discrepancy_percent: Option<f64>,
}
