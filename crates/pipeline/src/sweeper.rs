//! Timeout Sweeper (C16): one process-global background task that scans
//! every connection on a tick and retires idle ones.

use std::sync::Arc;

use relay_core::{ConnectionStore, Role, SessionStore, Transport};
use tracing::info;

pub struct TimeoutSweeper {
    connections: Arc<dyn ConnectionStore>,
    sessions: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    idle_timeout_secs: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub checked: u32,
    pub idle: u32,
    pub closed: u32,
    pub speaker_timeouts: u32,
    pub listener_timeouts: u32,
}

const TIMEOUT_NOTICE: &[u8] = b"connectionTimeout";

impl TimeoutSweeper {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        sessions: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
        idle_timeout_secs: u64,
    ) -> Self {
        Self {
            connections,
            sessions,
            transport,
            idle_timeout_secs,
        }
    }

    pub async fn sweep(&self, now_ms: i64) -> SweepSummary {
        let all = self.connections.scan_all_connections().await;
        let mut summary = SweepSummary {
            checked: all.len() as u32,
            ..Default::default()
        };

        for connection in all {
            if connection.idle_for_secs(now_ms) < self.idle_timeout_secs as i64 {
                continue;
            }
            summary.idle += 1;

            let _ = self.transport.send_to(&connection.connection_id, TIMEOUT_NOTICE).await;
            self.connections.delete_connection(&connection.connection_id).await;
            summary.closed += 1;

            match connection.role {
                Role::Speaker => {
                    self.sessions.mark_inactive(&connection.session_id).await;
                    summary.speaker_timeouts += 1;
                }
                Role::Listener => {
                    self.sessions.decrement_listener_count(&connection.session_id).await;
                    summary.listener_timeouts += 1;
                }
            }
        }

        info!(
            checked = summary.checked,
            idle = summary.idle,
            closed = summary.closed,
            speaker_timeouts = summary.speaker_timeouts,
            listener_timeouts = summary.listener_timeouts,
            "timeout sweep complete"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_store::InMemoryConnectionStore;
    use crate::session_store::InMemorySessionStore;
    use async_trait::async_trait;
    use relay_core::{Connection, Session};

    struct NoopTransport;
    #[async_trait]
    impl Transport for NoopTransport {
        async fn send_to(&self, _connection_id: &str, _payload: &[u8]) -> relay_core::SendOutcome {
            relay_core::SendOutcome::Sent
        }
    }

    fn session(id: &str) -> Session {
        Session::new(
            id.to_string(),
            "speaker-conn".to_string(),
            "user-1".to_string(),
            "en".to_string(),
            "standard".to_string(),
            0,
            2,
            true,
            0.85,
            5,
        )
    }

    #[tokio::test]
    async fn idle_listener_is_closed_and_decrements_count() {
        let connections = Arc::new(InMemoryConnectionStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        sessions.create_session(session("s1")).await.unwrap();
        sessions.increment_listener_count("s1").await.unwrap();

        connections
            .create_connection(Connection::new(
                "c1".to_string(),
                "s1".to_string(),
                Role::Listener,
                Some("es".to_string()),
                0,
                7_200,
                None,
            ))
            .await
            .unwrap();

        let sweeper = TimeoutSweeper::new(connections.clone(), sessions.clone(), Arc::new(NoopTransport), 120);
        let summary = sweeper.sweep(200_000).await;

        assert_eq!(summary.closed, 1);
        assert_eq!(summary.listener_timeouts, 1);
        assert_eq!(sessions.get_listener_count("s1").await, 0);
        assert!(connections.get_connection("c1").await.is_none());
    }

    #[tokio::test]
    async fn idle_speaker_marks_session_inactive() {
        let connections = Arc::new(InMemoryConnectionStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        sessions.create_session(session("s1")).await.unwrap();

        connections
            .create_connection(Connection::new(
                "speaker-conn".to_string(),
                "s1".to_string(),
                Role::Speaker,
                None,
                0,
                7_200,
                None,
            ))
            .await
            .unwrap();

        let sweeper = TimeoutSweeper::new(connections.clone(), sessions.clone(), Arc::new(NoopTransport), 120);
        let summary = sweeper.sweep(200_000).await;

        assert_eq!(summary.speaker_timeouts, 1);
        assert!(sessions.get_session("s1").await.unwrap().is_active == false);
    }

    #[tokio::test]
    async fn fresh_connections_are_untouched() {
        let connections = Arc::new(InMemoryConnectionStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        connections
            .create_connection(Connection::new(
                "c1".to_string(),
                "s1".to_string(),
                Role::Listener,
                Some("es".to_string()),
                0,
                7_200,
                None,
            ))
            .await
            .unwrap();

        let sweeper = TimeoutSweeper::new(connections.clone(), sessions, Arc::new(NoopTransport), 120);
        let summary = sweeper.sweep(10_000).await;

        assert_eq!(summary.closed, 0);
        assert!(connections.get_connection("c1").await.is_some());
    }
}
