//! Wire protocol for the speaker/listener WebSocket (§6), generalized from
//! the teacher's single `WsMessage` enum to this system's action set.

use serde::{Deserialize, Serialize};

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlCommand {
    Pause,
    Resume,
}

/// Inbound client -> server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateSession {
        source_language: String,
        quality_tier: String,
        #[serde(default)]
        partial_results: Option<bool>,
        #[serde(default)]
        min_stability: Option<f32>,
        #[serde(default)]
        max_buffer_timeout: Option<u64>,
    },
    JoinSession {
        session_id: String,
        target_language: String,
    },
    SendAudio {
        data: String,
    },
    Heartbeat,
    ControlSession {
        command: ControlCommand,
    },
    GetSessionStatus,
    ChangeLanguage {
        target_language: String,
    },
}

/// Outbound server -> client frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    SessionCreated {
        session_id: String,
        source_language: String,
        expires_at_secs: i64,
    },
    SessionJoined {
        session_id: String,
        target_language: String,
        listener_count: u32,
    },
    HeartbeatAck,
    ConnectionRefreshRequired,
    ConnectionWarning {
        remaining_minutes: i64,
    },
    ConnectionTimeout,
    SessionEnded {
        reason: String,
    },
    SessionPaused,
    SessionResumed,
    SessionStatus {
        listener_count: u32,
        language_distribution: std::collections::HashMap<String, u32>,
        session_duration_secs: i64,
        broadcast_state: relay_core::BroadcastState,
        timestamp_ms: i64,
    },
    AudioData {
        base64: String,
    },
    Error {
        code: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
    },
}

impl ServerMessage {
    pub fn from_error(err: &crate::error::ServerError) -> Self {
        let retry_after = match err {
            ServerError::Core(relay_core::CoreError::RateLimited { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            _ => None,
        };
        ServerMessage::Error {
            code: err.wire_code(),
            message: err.to_string(),
            details: None,
            retry_after,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","code":"INTERNAL_ERROR","message":"serialization failed"}"#
                .to_string()
        })
    }
}
