//! Pipeline Orchestrator (C12): the single entry point a forwarded
//! transcript flows through — translate, mark up, synthesize, broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::{ConnectionStore, EmotionDynamics, SessionStore};
use tracing::{info, warn};

use crate::broadcast::BroadcastFanout;
use crate::prosody;
use crate::synthesizer::ParallelSynthesizer;
use crate::translator::ParallelTranslator;

pub struct PipelineOrchestrator {
    sessions: Arc<dyn SessionStore>,
    connections: Arc<dyn ConnectionStore>,
    translator: Arc<ParallelTranslator>,
    synthesizer: Arc<ParallelSynthesizer>,
    broadcaster: Arc<BroadcastFanout>,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub languages_processed: Vec<String>,
    pub languages_failed: Vec<String>,
    pub broadcast_success_rate: f64,
    pub cache_hit_rate: f64,
    pub duration_ms: u64,
    pub success: bool,
}

impl ProcessOutcome {
    fn skipped(reason: &'static str) -> Self {
        info!(reason, "short-circuiting transcript processing");
        Self {
            languages_processed: Vec::new(),
            languages_failed: Vec::new(),
            broadcast_success_rate: 0.0,
            cache_hit_rate: 0.0,
            duration_ms: 0,
            success: true,
        }
    }

    fn failed(languages_failed: Vec<String>, duration_ms: u64) -> Self {
        Self {
            languages_processed: Vec::new(),
            languages_failed,
            broadcast_success_rate: 0.0,
            cache_hit_rate: 0.0,
            duration_ms,
            success: false,
        }
    }
}

impl PipelineOrchestrator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        connections: Arc<dyn ConnectionStore>,
        translator: Arc<ParallelTranslator>,
        synthesizer: Arc<ParallelSynthesizer>,
        broadcaster: Arc<BroadcastFanout>,
    ) -> Self {
        Self {
            sessions,
            connections,
            translator,
            synthesizer,
            broadcaster,
        }
    }

    pub async fn process_transcript(
        &self,
        session_id: &str,
        source_language: &str,
        text: &str,
        dynamics: &EmotionDynamics,
        now_ms: i64,
    ) -> ProcessOutcome {
        let started = std::time::Instant::now();

        if self.sessions.get_listener_count(session_id).await == 0 {
            return ProcessOutcome::skipped("no listeners");
        }

        let targets = self.connections.get_unique_target_languages(session_id).await;
        if targets.is_empty() {
            return ProcessOutcome::skipped("no target languages");
        }

        let (translations, translation_stats) = self
            .translator
            .translate_to_languages(source_language, text, &targets, now_ms)
            .await;
        if translations.is_empty() {
            warn!(session_id, "all translations failed");
            return ProcessOutcome::failed(targets, started.elapsed().as_millis() as u64);
        }

        let markup_by_language: HashMap<String, String> = translations
            .iter()
            .map(|(lang, translated)| (lang.clone(), prosody::generate(translated, dynamics)))
            .collect();

        let translated_languages: Vec<String> = markup_by_language.keys().cloned().collect();
        let audio_by_language = self.synthesizer.synthesize_to_languages(markup_by_language).await;
        if audio_by_language.is_empty() {
            warn!(session_id, "all synthesis attempts failed");
            return ProcessOutcome::failed(translated_languages, started.elapsed().as_millis() as u64);
        }

        let languages_processed: Vec<String> = audio_by_language.keys().cloned().collect();
        let languages_failed: Vec<String> = targets
            .iter()
            .filter(|lang| !languages_processed.contains(lang))
            .cloned()
            .collect();

        let broadcasts = audio_by_language.into_iter().map(|(language, bytes)| {
            let audio = Arc::new(bytes);
            let broadcaster = self.broadcaster.clone();
            let session_id = session_id.to_string();
            async move { broadcaster.broadcast_to_language(&session_id, &language, audio).await }
        });
        let broadcast_outcomes = futures::future::join_all(broadcasts).await;

        let (total_success, total_attempted) = broadcast_outcomes.iter().fold((0u32, 0u32), |(s, t), o| {
            (s + o.success_count, t + o.success_count + o.failure_count + o.stale_removed)
        });
        let broadcast_success_rate = if total_attempted == 0 {
            1.0
        } else {
            total_success as f64 / total_attempted as f64
        };

        ProcessOutcome {
            languages_processed,
            languages_failed,
            broadcast_success_rate,
            cache_hit_rate: translation_stats.cache_hit_rate(),
            duration_ms: started.elapsed().as_millis() as u64,
            success: true,
        }
    }
}
