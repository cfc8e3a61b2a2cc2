//! Application state: the composition root wiring every store, cache, and
//! external-collaborator stub into the pipeline orchestrator (teacher's
//! `AppState` pattern in `state.rs`, generalized to this system's traits).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use relay_config::{load_settings, EngineConfig, Settings};
use relay_core::{
    now_ms, AsrBackend, Connection, ConnectionStore, CoreError, EmotionDynamics, FinalResult,
    PartialResult, Role, Session, SessionStatus, SessionStore,
};
use relay_pipeline::{
    BroadcastFanout, DedupCache, FinalOutcome, FinalResultHandler, HeartbeatEngine,
    InMemoryConnectionStore, InMemorySessionStore, ParallelSynthesizer, ParallelTranslator,
    PartialOutcome, PartialResultHandler, PipelineOrchestrator, RateLimiter, ResultBuffer,
    SentenceBoundaryDetector, SweepSummary, TimeoutSweeper, TranslationCache,
};
use relay_resilience::{DegradationManager, RetryConfig};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::backends::{NullAsrBackend, PassthroughTranslatorBackend, SilentSynthBackend, WebSocketTransport};
use crate::error::ServerError;

/// ISO-639-1 codes this deployment accepts as a translation/listener target.
/// The real language catalog would come from the translation provider; this
/// is a placeholder list sized for the reference stub backend.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "zh", "ja", "ko", "ru", "ar", "hi",
];

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

/// Per-session C5/C6 state: the partial handler (skipped entirely when the
/// session disabled partial results) and the final handler, sharing one
/// result buffer so final results can reconcile against buffered partials.
struct SessionEngine {
    session_id: String,
    source_language: String,
    orchestrator: Arc<PipelineOrchestrator>,
    partial: Option<AsyncMutex<PartialResultHandler>>,
    final_handler: AsyncMutex<FinalResultHandler>,
    standalone_buffer: AsyncMutex<ResultBuffer>,
}

impl SessionEngine {
    fn new(session: &Session, engine: &EngineConfig, orchestrator: Arc<PipelineOrchestrator>) -> Self {
        let partial = if session.partial_results_enabled {
            Some(AsyncMutex::new(PartialResultHandler::new(
                ResultBuffer::new(
                    engine.result_buffer_capacity_secs,
                    engine.words_per_second,
                    session.min_stability_threshold,
                ),
                DedupCache::new(engine.dedup_cache_ttl_secs),
                RateLimiter::new(engine.rate_limit_window_ms, engine.max_rate_per_second as usize),
                SentenceBoundaryDetector::new(engine.pause_threshold_secs, session.max_buffer_timeout_secs),
                session.min_stability_threshold,
                orchestrator.clone(),
            )))
        } else {
            None
        };

        Self {
            session_id: session.session_id.clone(),
            source_language: session.source_language.clone(),
            orchestrator: orchestrator.clone(),
            partial,
            final_handler: AsyncMutex::new(FinalResultHandler::new(
                DedupCache::new(engine.dedup_cache_ttl_secs),
                orchestrator,
            )),
            standalone_buffer: AsyncMutex::new(ResultBuffer::new(
                engine.result_buffer_capacity_secs,
                engine.words_per_second,
                session.min_stability_threshold,
            )),
        }
    }

    async fn handle_partial(
        &self,
        result: PartialResult,
        source_language: &str,
        dynamics: &EmotionDynamics,
        now_ms: i64,
    ) -> Option<PartialOutcome> {
        let handler = self.partial.as_ref()?;
        let mut guard = handler.lock().await;
        Some(guard.handle(result, source_language, dynamics, now_ms).await)
    }

    async fn handle_final(
        &self,
        result: FinalResult,
        dynamics: &EmotionDynamics,
        now_ms: i64,
    ) -> FinalOutcome {
        let mut fh = self.final_handler.lock().await;
        if let Some(partial) = &self.partial {
            let mut p = partial.lock().await;
            fh.handle(result, p.buffer_mut(), dynamics, now_ms).await
        } else {
            let mut buf = self.standalone_buffer.lock().await;
            fh.handle(result, &mut buf, dynamics, now_ms).await
        }
    }

    /// Force-forwards every partial that has sat un-forwarded past
    /// `orphan_timeout_secs` with no matching final result (§4.1 "orphan
    /// flush"). Returns how many were forwarded, for sweep logging.
    async fn flush_orphans(&self, orphan_timeout_secs: u64, dynamics: &EmotionDynamics, now_ms: i64) -> usize {
        let orphaned: Vec<(String, String)> = if let Some(partial) = &self.partial {
            let mut guard = partial.lock().await;
            let ids: Vec<(String, String)> = guard
                .buffer_mut()
                .get_orphaned(orphan_timeout_secs, now_ms)
                .into_iter()
                .map(|b| (b.result.result_id.clone(), b.result.text.clone()))
                .collect();
            for (id, _) in &ids {
                guard.buffer_mut().mark_forwarded(id);
            }
            ids
        } else {
            let mut buf = self.standalone_buffer.lock().await;
            let ids: Vec<(String, String)> = buf
                .get_orphaned(orphan_timeout_secs, now_ms)
                .into_iter()
                .map(|b| (b.result.result_id.clone(), b.result.text.clone()))
                .collect();
            for (id, _) in &ids {
                buf.mark_forwarded(id);
            }
            ids
        };

        for (result_id, text) in &orphaned {
            tracing::debug!(session_id = %self.session_id, result_id = %result_id, "force-forwarding orphaned partial");
            self.orchestrator
                .process_transcript(&self.session_id, &self.source_language, text, dynamics, now_ms)
                .await;
        }
        orphaned.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<RwLock<Settings>>,
    env: Option<String>,
    pub sessions: Arc<dyn SessionStore>,
    pub connections: Arc<dyn ConnectionStore>,
    pub transport: Arc<WebSocketTransport>,
    pub asr: Arc<dyn AsrBackend>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub heartbeat: Arc<HeartbeatEngine>,
    pub sweeper: Arc<TimeoutSweeper>,
    /// Process-wide degraded-service registry (C17), surfaced at `/ready`.
    pub degradation: Arc<DegradationManager>,
    engines: Arc<DashMap<String, Arc<SessionEngine>>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self::with_env(settings, None)
    }

    pub fn with_env(settings: Settings, env: Option<String>) -> Self {
        let engine_cfg = settings.engine.clone();

        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let connections: Arc<dyn ConnectionStore> = Arc::new(InMemoryConnectionStore::new());
        let transport = Arc::new(WebSocketTransport::new());

        let cache = Arc::new(parking_lot::Mutex::new(TranslationCache::new(
            engine_cfg.translation_cache_max_entries,
            engine_cfg.translation_cache_ttl_secs,
        )));
        let translator = Arc::new(ParallelTranslator::new(
            Arc::new(PassthroughTranslatorBackend),
            cache,
            Duration::from_millis(engine_cfg.translate_timeout_ms),
        ));
        let synthesizer = Arc::new(ParallelSynthesizer::new(
            Arc::new(SilentSynthBackend),
            engine_cfg.max_concurrent_broadcasts,
            RetryConfig::default(),
        ));
        let broadcaster = Arc::new(BroadcastFanout::new(
            transport.clone() as Arc<dyn relay_core::Transport>,
            connections.clone(),
            engine_cfg.max_concurrent_broadcasts,
            engine_cfg.broadcast_max_retries,
            Duration::from_millis(100),
        ));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            sessions.clone(),
            connections.clone(),
            translator,
            synthesizer,
            broadcaster,
        ));

        let heartbeat = Arc::new(HeartbeatEngine::new(
            connections.clone(),
            engine_cfg.connection_refresh_minutes,
            engine_cfg.connection_warning_minutes,
            engine_cfg.session_max_duration_hours,
        ));
        let sweeper = Arc::new(TimeoutSweeper::new(
            connections.clone(),
            sessions.clone(),
            transport.clone() as Arc<dyn relay_core::Transport>,
            engine_cfg.connection_idle_timeout_seconds,
        ));

        Self {
            settings: Arc::new(RwLock::new(settings)),
            env,
            sessions,
            connections,
            transport,
            asr: Arc::new(NullAsrBackend),
            orchestrator,
            heartbeat,
            sweeper,
            degradation: Arc::new(DegradationManager::new()),
            engines: Arc::new(DashMap::new()),
        }
    }

    pub fn reload_config(&self) -> Result<(), String> {
        let new_settings =
            load_settings(self.env.as_deref()).map_err(|e| format!("failed to reload config: {e}"))?;
        *self.settings.write() = new_settings;
        tracing::info!("configuration reloaded successfully");
        Ok(())
    }

    pub fn get_settings(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.settings.read()
    }

    /// Creates a session plus its speaker connection, atomically from the
    /// caller's point of view: if either store write fails, nothing is
    /// left dangling since the connection is only inserted after the
    /// session succeeds and this is the only writer for a fresh session id.
    pub async fn create_session(
        &self,
        source_language: String,
        quality_tier: String,
        partial_results: Option<bool>,
        min_stability: Option<f32>,
        max_buffer_timeout: Option<u64>,
    ) -> Result<(Session, String), ServerError> {
        if source_language.trim().is_empty() {
            return Err(CoreError::Validation("sourceLanguage is required".to_string()).into());
        }
        let engine_cfg = self.settings.read().engine.clone();

        let min_stability = min_stability.unwrap_or(engine_cfg.min_stability_threshold);
        if !(0.70..=0.95).contains(&min_stability) {
            return Err(CoreError::Validation("minStability must be in [0.70, 0.95]".to_string()).into());
        }
        let max_buffer_timeout = max_buffer_timeout.unwrap_or(engine_cfg.max_buffer_timeout_secs);
        if !(2..=10).contains(&max_buffer_timeout) {
            return Err(CoreError::Validation("maxBufferTimeout must be in [2, 10]".to_string()).into());
        }

        let connection_id = Uuid::new_v4().to_string();
        let now = now_ms();

        // `createSession` is conditional on session_id being absent; a
        // collision regenerates the id and retries rather than failing the
        // request (§4.13).
        const MAX_ID_COLLISION_RETRIES: u32 = 5;
        let mut session_id = Uuid::new_v4().to_string();
        let mut attempt = 0;
        let session = loop {
            let candidate = Session::new(
                session_id.clone(),
                connection_id.clone(),
                connection_id.clone(),
                source_language.clone(),
                quality_tier.clone(),
                now,
                engine_cfg.session_max_duration_hours,
                partial_results.unwrap_or(engine_cfg.partial_results_enabled),
                min_stability,
                max_buffer_timeout,
            );
            match self.sessions.create_session(candidate.clone()).await {
                Ok(()) => break candidate,
                Err(CoreError::AlreadyExists(_)) if attempt < MAX_ID_COLLISION_RETRIES => {
                    tracing::warn!(session_id = %session_id, attempt, "session id collision, regenerating");
                    session_id = Uuid::new_v4().to_string();
                    attempt += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        };

        self.connections
            .create_connection(Connection::new(
                connection_id.clone(),
                session_id.clone(),
                Role::Speaker,
                None,
                now,
                session.expires_at_secs,
                None,
            ))
            .await?;

        self.engines.insert(
            session_id.clone(),
            Arc::new(SessionEngine::new(&session, &engine_cfg, self.orchestrator.clone())),
        );

        Ok((session, connection_id))
    }

    pub async fn join_session(
        &self,
        session_id: &str,
        target_language: &str,
    ) -> Result<(Session, String, u32), ServerError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await
            .ok_or_else(|| CoreError::NotFound(format!("session {session_id} not found")))?;
        if !session.is_active {
            return Err(CoreError::NotFound(format!("session {session_id} not found")).into());
        }
        if !is_supported_language(target_language) {
            return Err(CoreError::UnsupportedLanguage(target_language.to_string()).into());
        }

        let engine_cfg = self.settings.read().engine.clone();
        if self.sessions.get_listener_count(session_id).await >= engine_cfg.max_listeners_per_session {
            return Err(CoreError::SessionFull.into());
        }

        let connection_id = Uuid::new_v4().to_string();
        let now = now_ms();
        self.connections
            .create_connection(Connection::new(
                connection_id.clone(),
                session_id.to_string(),
                Role::Listener,
                Some(target_language.to_string()),
                now,
                session.expires_at_secs,
                None,
            ))
            .await?;

        let listener_count = self.sessions.increment_listener_count(session_id).await?;
        Ok((session, connection_id, listener_count))
    }

    pub async fn submit_audio(&self, session_id: &str, chunk: &[u8]) -> Result<(), ServerError> {
        match self.asr.submit_audio(session_id, chunk).await {
            Ok(()) => {
                self.degradation.recover("asr");
                Ok(())
            }
            Err(err) => {
                self.degradation.degrade("asr", err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn change_language(&self, connection_id: &str, target_language: &str) -> Result<(), ServerError> {
        if !is_supported_language(target_language) {
            return Err(CoreError::UnsupportedLanguage(target_language.to_string()).into());
        }
        if !self.connections.set_target_language(connection_id, target_language).await {
            return Err(ServerError::ConnectionNotFound(connection_id.to_string()));
        }
        Ok(())
    }

    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatus, ServerError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await
            .ok_or_else(|| CoreError::NotFound(format!("session {session_id} not found")))?;

        let targets = self.connections.get_unique_target_languages(session_id).await;
        let mut language_distribution = HashMap::with_capacity(targets.len());
        for lang in targets {
            let count = self.connections.get_listeners_by_language(session_id, &lang).await.len() as u32;
            language_distribution.insert(lang, count);
        }

        let now = now_ms();
        Ok(SessionStatus {
            listener_count: session.listener_count,
            language_distribution,
            session_duration_secs: (now - session.created_at_ms).max(0) / 1000,
            broadcast_state: session.broadcast_state,
            timestamp_ms: now,
        })
    }

    pub async fn control_session(
        &self,
        session_id: &str,
        pause: bool,
    ) -> Result<Vec<String>, ServerError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await
            .ok_or_else(|| CoreError::NotFound(format!("session {session_id} not found")))?;

        let mut state = session.broadcast_state;
        state.is_paused = pause;
        state.is_active = !pause;
        state.last_state_change_ms = now_ms();
        self.sessions.update_broadcast_state(session_id, state).await;

        let listeners = self
            .connections
            .scan_all_connections()
            .await
            .into_iter()
            .filter(|c| c.session_id == session_id && c.role == Role::Listener)
            .map(|c| c.connection_id)
            .collect();
        Ok(listeners)
    }

    /// Drives one partial-result through this session's C5 path. Returns
    /// `None` if the session has partial results disabled or is unknown.
    pub async fn handle_partial_result(
        &self,
        result: PartialResult,
        source_language: &str,
        dynamics: &EmotionDynamics,
    ) -> Option<PartialOutcome> {
        let engine = self.engines.get(&result.session_id)?.clone();
        engine.handle_partial(result, source_language, dynamics, now_ms()).await
    }

    pub async fn handle_final_result(
        &self,
        result: FinalResult,
        dynamics: &EmotionDynamics,
    ) -> Option<FinalOutcome> {
        let engine = self.engines.get(&result.session_id)?.clone();
        Some(engine.handle_final(result, dynamics, now_ms()).await)
    }

    pub fn end_session(&self, session_id: &str) {
        self.engines.remove(session_id);
    }

    pub async fn run_sweep(&self) -> SweepSummary {
        let summary = self.sweeper.sweep(now_ms()).await;
        let flushed = self.flush_orphans().await;
        if flushed > 0 {
            tracing::info!(flushed, "orphan flush forwarded stale buffered partials");
        }
        summary
    }

    /// Force-forwards every session's orphaned partials (§4.1). Run
    /// alongside the connection sweep so un-acknowledged partials don't
    /// sit in their buffer forever when no matching final ever arrives.
    async fn flush_orphans(&self) -> usize {
        let orphan_timeout_secs = self.settings.read().engine.orphan_timeout_secs;
        let now = now_ms();
        let dynamics = EmotionDynamics::default();

        let engines: Vec<Arc<SessionEngine>> = self.engines.iter().map(|entry| entry.value().clone()).collect();
        let mut total = 0;
        for engine in engines {
            total += engine.flush_orphans(orphan_timeout_secs, &dynamics, now).await;
        }
        total
    }
}
