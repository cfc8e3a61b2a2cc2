//! Parallel Synthesizer (C10): turns per-language prosody markup into audio
//! bytes, bounded by a concurrency limit and retried per C17's policy.

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::{CoreError, SynthBackend};
use relay_resilience::{retry_with_backoff, RetryConfig};
use tokio::sync::Semaphore;
use tracing::warn;

pub struct ParallelSynthesizer {
    backend: Arc<dyn SynthBackend>,
    semaphore: Arc<Semaphore>,
    retry_config: RetryConfig,
}

impl ParallelSynthesizer {
    pub fn new(backend: Arc<dyn SynthBackend>, max_concurrency: usize, retry_config: RetryConfig) -> Self {
        Self {
            backend,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            retry_config,
        }
    }

    /// Synthesizes every `(language, markup)` pair. Per-language failures
    /// are omitted from the result map; one failing language never blocks
    /// or cancels its peers.
    pub async fn synthesize_to_languages(
        &self,
        markup_by_language: HashMap<String, String>,
    ) -> HashMap<String, Vec<u8>> {
        let futures = markup_by_language
            .into_iter()
            .map(|(language, markup)| self.synthesize_one(language, markup));

        futures::future::join_all(futures)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn synthesize_one(&self, language: String, markup: String) -> Option<(String, Vec<u8>)> {
        let _permit = self.semaphore.acquire().await.ok()?;

        let result = retry_with_backoff(
            &self.retry_config,
            CoreError::is_retryable,
            || self.backend.synth(&markup, &language),
        )
        .await;

        match result {
            Ok(bytes) => Some((language, bytes)),
            Err(err) => {
                warn!(language = %language, error = %err, "synthesis failed after retries, omitting from batch");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct EchoSynth;

    #[async_trait]
    impl SynthBackend for EchoSynth {
        async fn synth(&self, markup: &str, _language: &str) -> Result<Vec<u8>, CoreError> {
            Ok(markup.as_bytes().to_vec())
        }
    }

    struct AlwaysFailsSynth;

    #[async_trait]
    impl SynthBackend for AlwaysFailsSynth {
        async fn synth(&self, _markup: &str, _language: &str) -> Result<Vec<u8>, CoreError> {
            Err(CoreError::RetryableTransient("tts down".to_string()))
        }
    }

    struct RecoversAfterOneFailure {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SynthBackend for RecoversAfterOneFailure {
        async fn synth(&self, markup: &str, _language: &str) -> Result<Vec<u8>, CoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(CoreError::RetryableTransient("cold start".to_string()))
            } else {
                Ok(markup.as_bytes().to_vec())
            }
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_fraction: 0.0,
        }
    }

    #[tokio::test]
    async fn synthesizes_all_languages() {
        let synth = ParallelSynthesizer::new(Arc::new(EchoSynth), 4, fast_retry());
        let mut markup = HashMap::new();
        markup.insert("es".to_string(), "hola".to_string());
        markup.insert("fr".to_string(), "bonjour".to_string());

        let out = synth.synthesize_to_languages(markup).await;
        assert_eq!(out.get("es").unwrap(), b"hola");
        assert_eq!(out.get("fr").unwrap(), b"bonjour");
    }

    #[tokio::test]
    async fn exhausted_retries_omit_the_language() {
        let synth = ParallelSynthesizer::new(Arc::new(AlwaysFailsSynth), 4, fast_retry());
        let mut markup = HashMap::new();
        markup.insert("es".to_string(), "hola".to_string());

        let out = synth.synthesize_to_languages(markup).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn recovers_within_retry_budget() {
        let backend = Arc::new(RecoversAfterOneFailure {
            calls: AtomicU32::new(0),
        });
        let synth = ParallelSynthesizer::new(backend, 4, fast_retry());
        let mut markup = HashMap::new();
        markup.insert("es".to_string(), "hola".to_string());

        let out = synth.synthesize_to_languages(markup).await;
        assert_eq!(out.get("es").unwrap(), b"hola");
    }
}
