//! Connection entity (§3 Data Model).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Speaker,
    Listener,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub session_id: String,
    pub role: Role,
    /// Listeners only; `None` and an empty string are both meaningless here,
    /// this is a real `Option` so "no target chosen yet" is distinguishable
    /// from any concrete language code.
    pub target_language: Option<String>,
    pub connected_at_ms: i64,
    pub last_activity_ms: i64,
    /// Seconds since epoch.
    pub ttl_secs: i64,
    pub ip_address: Option<String>,
}

impl Connection {
    pub fn new(
        connection_id: String,
        session_id: String,
        role: Role,
        target_language: Option<String>,
        now_ms: i64,
        session_expires_at_secs: i64,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            connection_id,
            session_id,
            role,
            target_language,
            connected_at_ms: now_ms,
            last_activity_ms: now_ms,
            ttl_secs: session_expires_at_secs + 3600,
            ip_address,
        }
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.last_activity_ms = now_ms;
    }

    pub fn idle_for_secs(&self, now_ms: i64) -> i64 {
        (now_ms - self.last_activity_ms).max(0) / 1000
    }

    pub fn age_secs(&self, now_ms: i64) -> i64 {
        (now_ms - self.connected_at_ms).max(0) / 1000
    }
}
