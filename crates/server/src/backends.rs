//! Stand-in implementations of the external-collaborator traits. The real
//! ASR, translation, and TTS providers are out of scope for this system —
//! these exist only so the composition root has something concrete to wire
//! in; swap them for real API clients without touching `relay-pipeline`.

use async_trait::async_trait;
use axum::extract::ws::Message;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use dashmap::DashMap;
use relay_core::{AsrBackend, CoreError, SendOutcome, SynthBackend, TranslatorBackend, Transport};
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

pub struct PassthroughTranslatorBackend;

#[async_trait]
impl TranslatorBackend for PassthroughTranslatorBackend {
    async fn translate(&self, _source: &str, target: &str, text: &str) -> Result<String, CoreError> {
        Ok(format!("[{target}] {text}"))
    }
}

pub struct SilentSynthBackend;

#[async_trait]
impl SynthBackend for SilentSynthBackend {
    async fn synth(&self, markup: &str, _language: &str) -> Result<Vec<u8>, CoreError> {
        Ok(markup.as_bytes().to_vec())
    }
}

pub struct NullAsrBackend;

#[async_trait]
impl AsrBackend for NullAsrBackend {
    async fn submit_audio(&self, _session_id: &str, _chunk: &[u8]) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Routes broadcast sends to the live WebSocket sink for a connection,
/// keyed by `connection_id`. Registered/unregistered by the socket task.
#[derive(Default)]
pub struct WebSocketTransport {
    senders: DashMap<String, mpsc::UnboundedSender<Message>>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: String, sender: mpsc::UnboundedSender<Message>) {
        self.senders.insert(connection_id, sender);
    }

    pub fn unregister(&self, connection_id: &str) {
        self.senders.remove(connection_id);
    }

    /// Sends an already-serialized `ServerMessage` frame directly, bypassing
    /// the `audioData` envelope `send_to` applies to raw bytes. Used for
    /// control notices (`sessionPaused`/`sessionResumed`, etc.) that are
    /// frames in their own right, not payloads to wrap.
    pub fn send_json(&self, connection_id: &str, json: String) -> SendOutcome {
        match self.senders.get(connection_id) {
            Some(sender) => match sender.send(Message::Text(json)) {
                Ok(()) => SendOutcome::Sent,
                Err(_) => SendOutcome::Gone,
            },
            None => SendOutcome::Gone,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    /// Wraps `payload` (synthesized audio bytes) as the wire protocol's
    /// `audioData{base64}` JSON frame and delivers it as a text frame — the
    /// wire protocol is all-JSON, so raw bytes never go out as a binary
    /// frame.
    async fn send_to(&self, connection_id: &str, payload: &[u8]) -> SendOutcome {
        let json = ServerMessage::AudioData { base64: BASE64.encode(payload) }.to_json();
        match self.senders.get(connection_id) {
            Some(sender) => match sender.send(Message::Text(json)) {
                Ok(()) => SendOutcome::Sent,
                Err(_) => SendOutcome::Gone,
            },
            None => SendOutcome::Gone,
        }
    }
}
