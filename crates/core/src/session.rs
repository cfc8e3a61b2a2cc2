//! Session entity (§3 Data Model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single speaker's live translation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub speaker_connection_id: String,
    pub speaker_user_id: String,
    pub source_language: String,
    pub quality_tier: String,
    pub created_at_ms: i64,
    /// Wall-clock expiry, seconds since epoch.
    pub expires_at_secs: i64,
    pub is_active: bool,
    pub listener_count: u32,
    pub broadcast_state: BroadcastState,
    pub partial_results_enabled: bool,
    pub min_stability_threshold: f32,
    pub max_buffer_timeout_secs: u64,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        speaker_connection_id: String,
        speaker_user_id: String,
        source_language: String,
        quality_tier: String,
        created_at_ms: i64,
        session_max_duration_hours: i64,
        partial_results_enabled: bool,
        min_stability_threshold: f32,
        max_buffer_timeout_secs: u64,
    ) -> Self {
        let expires_at_secs = created_at_ms / 1000 + session_max_duration_hours * 3600;
        Self {
            session_id,
            speaker_connection_id,
            speaker_user_id,
            source_language,
            quality_tier,
            created_at_ms,
            expires_at_secs,
            is_active: true,
            listener_count: 0,
            broadcast_state: BroadcastState::default(),
            partial_results_enabled,
            min_stability_threshold,
            max_buffer_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastState {
    pub is_active: bool,
    pub is_paused: bool,
    pub is_muted: bool,
    pub volume: f32,
    pub last_state_change_ms: i64,
}

impl Default for BroadcastState {
    fn default() -> Self {
        Self {
            is_active: true,
            is_paused: false,
            is_muted: false,
            volume: 1.0,
            last_state_change_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Snapshot returned by `getSessionStatus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub listener_count: u32,
    pub language_distribution: std::collections::HashMap<String, u32>,
    pub session_duration_secs: i64,
    pub broadcast_state: BroadcastState,
    pub timestamp_ms: i64,
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

pub fn to_datetime_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}
