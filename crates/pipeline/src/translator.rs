//! Parallel Translator (C8): fans a single source text out to every
//! requested target language, cache-first, each target independently
//! timed out and isolated from its peers' failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relay_core::TranslatorBackend;
use tracing::warn;

use crate::translation_cache::TranslationCache;

pub struct ParallelTranslator {
    backend: Arc<dyn TranslatorBackend>,
    cache: Arc<Mutex<TranslationCache>>,
    per_target_timeout: Duration,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TranslationBatchStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub cache_hits: usize,
}

impl TranslationBatchStats {
    pub fn cache_hit_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.attempted as f64
        }
    }
}

impl ParallelTranslator {
    pub fn new(
        backend: Arc<dyn TranslatorBackend>,
        cache: Arc<Mutex<TranslationCache>>,
        per_target_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            cache,
            per_target_timeout,
        }
    }

    /// Translates `text` into every language in `targets`. Per-target
    /// failures (timeout or backend error) are omitted from the result map;
    /// they never cancel sibling translations.
    pub async fn translate_to_languages(
        &self,
        source: &str,
        text: &str,
        targets: &[String],
        now_ms: i64,
    ) -> (HashMap<String, String>, TranslationBatchStats) {
        let mut stats = TranslationBatchStats {
            attempted: targets.len(),
            ..Default::default()
        };

        let futures = targets.iter().map(|target| {
            let target = target.clone();
            self.translate_one(source, text, &target, now_ms)
        });

        let results = futures::future::join_all(futures).await;

        let mut out = HashMap::with_capacity(targets.len());
        for (target, outcome) in targets.iter().zip(results) {
            match outcome {
                Some((translated, from_cache)) => {
                    stats.succeeded += 1;
                    if from_cache {
                        stats.cache_hits += 1;
                    }
                    out.insert(target.clone(), translated);
                }
                None => {
                    warn!(target = %target, "translation failed or timed out, omitting from batch");
                }
            }
        }

        (out, stats)
    }

    async fn translate_one(
        &self,
        source: &str,
        text: &str,
        target: &str,
        now_ms: i64,
    ) -> Option<(String, bool)> {
        if let Some(cached) = self.cache.lock().get(source, target, text, now_ms) {
            return Some((cached, true));
        }

        let attempt = self.backend.translate(source, target, text);
        match tokio::time::timeout(self.per_target_timeout, attempt).await {
            Ok(Ok(translated)) => {
                self.cache.lock().put(source, target, text, translated.clone(), now_ms);
                Some((translated, false))
            }
            Ok(Err(err)) => {
                warn!(target = %target, error = %err, "translator backend error");
                None
            }
            Err(_) => {
                warn!(target = %target, "translator backend timed out");
                None
            }
        }
    }
}
