//! Broadcast Fan-out (C11): pushes synthesized audio to every listener
//! tuned to a language, reaping stale connections best-effort and retrying
//! transient transport backpressure.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{ConnectionStore, SendOutcome, Transport};
use tokio::sync::Semaphore;
use tracing::warn;

#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastOutcome {
    pub success_count: u32,
    pub failure_count: u32,
    pub stale_removed: u32,
    pub duration_ms: u64,
}

pub struct BroadcastFanout {
    transport: Arc<dyn Transport>,
    connections: Arc<dyn ConnectionStore>,
    semaphore: Arc<Semaphore>,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl BroadcastFanout {
    pub fn new(
        transport: Arc<dyn Transport>,
        connections: Arc<dyn ConnectionStore>,
        max_concurrent_sends: usize,
        max_retries: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self {
            transport,
            connections,
            semaphore: Arc::new(Semaphore::new(max_concurrent_sends.max(1))),
            max_retries,
            retry_base_delay,
        }
    }

    pub async fn broadcast_to_language(
        &self,
        session_id: &str,
        target_language: &str,
        audio: Arc<Vec<u8>>,
    ) -> BroadcastOutcome {
        let started = std::time::Instant::now();
        let listener_ids = self
            .connections
            .get_listeners_by_language(session_id, target_language)
            .await;

        let sends = listener_ids
            .into_iter()
            .map(|connection_id| self.send_one(connection_id, audio.clone()));

        let results = futures::future::join_all(sends).await;

        let mut outcome = BroadcastOutcome::default();
        for result in results {
            match result {
                SendResult::Success => outcome.success_count += 1,
                SendResult::Stale => outcome.stale_removed += 1,
                SendResult::Failure => outcome.failure_count += 1,
            }
        }
        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    async fn send_one(&self, connection_id: String, audio: Arc<Vec<u8>>) -> SendResult {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return SendResult::Failure,
        };

        let mut attempt = 0;
        loop {
            match self.transport.send_to(&connection_id, &audio).await {
                SendOutcome::Sent => return SendResult::Success,
                SendOutcome::Gone => {
                    self.connections.delete_connection(&connection_id).await;
                    return SendResult::Stale;
                }
                SendOutcome::TransientLimitExceeded => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(connection_id = %connection_id, "broadcast send exhausted retries");
                        return SendResult::Failure;
                    }
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt - 1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

enum SendResult {
    Success,
    Stale,
    Failure,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use relay_core::{Connection, Role};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubConnectionStore {
        listeners: Vec<String>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConnectionStore for StubConnectionStore {
        async fn create_connection(&self, _connection: Connection) -> Result<(), relay_core::CoreError> {
            Ok(())
        }
        async fn get_connection(&self, _connection_id: &str) -> Option<Connection> {
            None
        }
        async fn delete_connection(&self, connection_id: &str) -> Option<Connection> {
            self.deleted.lock().push(connection_id.to_string());
            None
        }
        async fn touch_connection(&self, _connection_id: &str, _now_ms: i64) {}
        async fn set_target_language(&self, _connection_id: &str, _language: &str) -> bool {
            true
        }
        async fn get_listeners_by_language(&self, _session_id: &str, _language: &str) -> Vec<String> {
            self.listeners.clone()
        }
        async fn get_unique_target_languages(&self, _session_id: &str) -> Vec<String> {
            Vec::new()
        }
        async fn scan_all_connections(&self) -> Vec<Connection> {
            Vec::new()
        }
        async fn batch_delete(&self, _connection_ids: &[String]) -> Vec<String> {
            Vec::new()
        }
        async fn count_for_session(&self, _session_id: &str, _role: Role) -> u32 {
            0
        }
    }

    struct ScriptedTransport {
        outcomes: HashMap<String, Vec<SendOutcome>>,
        calls: Mutex<HashMap<String, AtomicU32>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send_to(&self, connection_id: &str, _payload: &[u8]) -> SendOutcome {
            let idx = {
                let calls = self.calls.lock();
                calls
                    .get(connection_id)
                    .map(|c| c.fetch_add(1, Ordering::SeqCst) as usize)
                    .unwrap_or(0)
            };
            self.outcomes
                .get(connection_id)
                .and_then(|seq| seq.get(idx).copied())
                .unwrap_or(SendOutcome::Sent)
        }
    }

    fn transport(outcomes: HashMap<String, Vec<SendOutcome>>) -> Arc<ScriptedTransport> {
        let calls = outcomes
            .keys()
            .map(|k| (k.clone(), AtomicU32::new(0)))
            .collect();
        Arc::new(ScriptedTransport { outcomes, calls: Mutex::new(calls) })
    }

    #[tokio::test]
    async fn all_sends_succeed() {
        let outcomes = HashMap::from([("c1".to_string(), vec![SendOutcome::Sent])]);
        let fanout = BroadcastFanout::new(
            transport(outcomes),
            Arc::new(StubConnectionStore { listeners: vec!["c1".to_string()], deleted: Mutex::new(Vec::new()) }),
            10,
            2,
            Duration::from_millis(1),
        );

        let outcome = fanout.broadcast_to_language("s1", "es", Arc::new(vec![1, 2, 3])).await;
        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.failure_count, 0);
        assert_eq!(outcome.stale_removed, 0);
    }

    #[tokio::test]
    async fn gone_connection_is_reaped_and_counted_as_stale() {
        let outcomes = HashMap::from([("c1".to_string(), vec![SendOutcome::Gone])]);
        let store = Arc::new(StubConnectionStore { listeners: vec!["c1".to_string()], deleted: Mutex::new(Vec::new()) });
        let fanout = BroadcastFanout::new(transport(outcomes), store.clone(), 10, 2, Duration::from_millis(1));

        let outcome = fanout.broadcast_to_language("s1", "es", Arc::new(vec![1])).await;
        assert_eq!(outcome.stale_removed, 1);
        assert_eq!(store.deleted.lock().as_slice(), ["c1".to_string()]);
    }

    #[tokio::test]
    async fn transient_limit_retries_then_succeeds() {
        let outcomes = HashMap::from([(
            "c1".to_string(),
            vec![SendOutcome::TransientLimitExceeded, SendOutcome::Sent],
        )]);
        let fanout = BroadcastFanout::new(
            transport(outcomes),
            Arc::new(StubConnectionStore { listeners: vec!["c1".to_string()], deleted: Mutex::new(Vec::new()) }),
            10,
            2,
            Duration::from_millis(1),
        );

        let outcome = fanout.broadcast_to_language("s1", "es", Arc::new(vec![1])).await;
        assert_eq!(outcome.success_count, 1);
    }

    #[tokio::test]
    async fn transient_limit_exhausts_retries_and_counts_as_failure() {
        let outcomes = HashMap::from([(
            "c1".to_string(),
            vec![
                SendOutcome::TransientLimitExceeded,
                SendOutcome::TransientLimitExceeded,
                SendOutcome::TransientLimitExceeded,
            ],
        )]);
        let fanout = BroadcastFanout::new(
            transport(outcomes),
            Arc::new(StubConnectionStore { listeners: vec!["c1".to_string()], deleted: Mutex::new(Vec::new()) }),
            10,
            2,
            Duration::from_millis(1),
        );

        let outcome = fanout.broadcast_to_language("s1", "es", Arc::new(vec![1])).await;
        assert_eq!(outcome.failure_count, 1);
    }
}
