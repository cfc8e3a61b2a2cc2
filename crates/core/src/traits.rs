//! Narrow interfaces to every external collaborator (§9 Design Notes).
//!
//! The ASR/TTS/translation providers, the listener transport, and the
//! session/connection persistence layer are all out of scope for this
//! engine — it only depends on these traits, injected at the composition
//! root. Swapping an in-memory store for a distributed one, or a stub
//! translator for a real API client, never touches the engine crate.

use async_trait::async_trait;

use crate::connection::{Connection, Role};
use crate::error::CoreError;
use crate::session::{BroadcastState, Session};

/// Hands a speaker's raw audio chunk off to the external ASR provider.
/// The provider reports partial/final transcripts back asynchronously
/// through `PartialResultHandler`/`FinalResultHandler`, not through this
/// trait — this is purely the upload half of that relationship.
#[async_trait]
pub trait AsrBackend: Send + Sync {
    async fn submit_audio(&self, session_id: &str, chunk: &[u8]) -> Result<(), CoreError>;
}

/// A single translation call: `source` and `target` are ISO-639-1 codes.
#[async_trait]
pub trait TranslatorBackend: Send + Sync {
    async fn translate(
        &self,
        source: &str,
        target: &str,
        text: &str,
    ) -> Result<String, CoreError>;
}

/// Speech synthesis of prosody-annotated markup into audio bytes for one
/// language/voice.
#[async_trait]
pub trait SynthBackend: Send + Sync {
    async fn synth(&self, markup: &str, language: &str) -> Result<Vec<u8>, CoreError>;
}

/// Outcome of a single send attempt to a listener connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The peer is gone; the caller should reap the connection.
    Gone,
    /// A transient, retryable send failure (e.g. backpressure).
    TransientLimitExceeded,
}

/// The messaging transport used to push frames to a connected client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_to(&self, connection_id: &str, payload: &[u8]) -> SendOutcome;
}

/// Session persistence primitives (C13). All mutating operations are
/// conditional — the design explicitly forbids a plain read-modify-write
/// on shared counters.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Atomic insert conditional on `session_id` being absent.
    async fn create_session(&self, session: Session) -> Result<(), CoreError>;

    async fn get_session(&self, session_id: &str) -> Option<Session>;

    /// `+1`, conditional on `session exists AND is_active`. Returns the new
    /// count, or an error if the session is missing/inactive.
    async fn increment_listener_count(&self, session_id: &str) -> Result<u32, CoreError>;

    /// `-1` with a floor of zero. Never returns a negative count; a
    /// conditional-check failure (count already zero) is a silent no-op
    /// that returns the current value (zero).
    async fn decrement_listener_count(&self, session_id: &str) -> u32;

    async fn get_listener_count(&self, session_id: &str) -> u32;

    async fn update_speaker_connection(
        &self,
        session_id: &str,
        new_connection_id: &str,
    ) -> Result<(), CoreError>;

    async fn update_broadcast_state(&self, session_id: &str, state: BroadcastState);

    async fn mark_inactive(&self, session_id: &str);

    async fn list_active_sessions(&self) -> Vec<Session>;
}

/// Connection persistence primitives (C14).
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn create_connection(&self, connection: Connection) -> Result<(), CoreError>;

    async fn get_connection(&self, connection_id: &str) -> Option<Connection>;

    async fn delete_connection(&self, connection_id: &str) -> Option<Connection>;

    async fn touch_connection(&self, connection_id: &str, now_ms: i64);

    async fn set_target_language(&self, connection_id: &str, language: &str) -> bool;

    /// Connection ids for listeners of `session_id` tuned to `language`.
    async fn get_listeners_by_language(&self, session_id: &str, language: &str) -> Vec<String>;

    async fn get_unique_target_languages(&self, session_id: &str) -> Vec<String>;

    async fn scan_all_connections(&self) -> Vec<Connection>;

    /// Best-effort batch delete; returns ids that failed to delete (empty
    /// for the in-memory implementation, which cannot partially fail).
    async fn batch_delete(&self, connection_ids: &[String]) -> Vec<String>;

    async fn count_for_session(&self, session_id: &str, role: Role) -> u32;
}
