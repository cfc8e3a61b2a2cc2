//! Heartbeat / Refresh Engine (C15): per-heartbeat bookkeeping for a single
//! connection — acks, activity refresh, and age-based refresh/warning
//! signals.

use relay_core::{ConnectionStore, Role};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum HeartbeatSignal {
    /// Always emitted first.
    Ack,
    RefreshRequired {
        session_id: String,
        role: Role,
        target_language: Option<String>,
    },
    Warning {
        remaining_minutes: i64,
    },
}

pub struct HeartbeatEngine {
    connections: Arc<dyn ConnectionStore>,
    refresh_minutes: u64,
    warning_minutes: u64,
    session_max_duration_hours: i64,
}

impl HeartbeatEngine {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        refresh_minutes: u64,
        warning_minutes: u64,
        session_max_duration_hours: i64,
    ) -> Self {
        Self {
            connections,
            refresh_minutes,
            warning_minutes,
            session_max_duration_hours,
        }
    }

    /// Processes one heartbeat from `connection_id`, touching its
    /// last-activity timestamp and returning every signal the caller
    /// should forward to the client, in order.
    pub async fn handle_heartbeat(&self, connection_id: &str, now_ms: i64) -> Vec<HeartbeatSignal> {
        let mut signals = vec![HeartbeatSignal::Ack];

        let Some(connection) = self.connections.get_connection(connection_id).await else {
            return signals;
        };
        self.connections.touch_connection(connection_id, now_ms).await;

        let age_min = connection.age_secs(now_ms) / 60;

        if age_min >= self.refresh_minutes as i64 && (age_min as u64) < self.hard_limit_minutes() {
            signals.push(HeartbeatSignal::RefreshRequired {
                session_id: connection.session_id.clone(),
                role: connection.role,
                target_language: connection.target_language.clone(),
            });
        }

        if age_min >= self.warning_minutes as i64 {
            let remaining = self.hard_limit_minutes() as i64 - age_min;
            signals.push(HeartbeatSignal::Warning {
                remaining_minutes: remaining.max(0),
            });
        }

        signals
    }

    fn hard_limit_minutes(&self) -> u64 {
        (self.session_max_duration_hours * 60) as u64
    }
}
