//! In-memory Connection Store (C14).

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{Connection, ConnectionStore, CoreError, Role};

#[derive(Default)]
pub struct InMemoryConnectionStore {
    connections: DashMap<String, Connection>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn create_connection(&self, connection: Connection) -> Result<(), CoreError> {
        self.connections.insert(connection.connection_id.clone(), connection);
        Ok(())
    }

    async fn get_connection(&self, connection_id: &str) -> Option<Connection> {
        self.connections.get(connection_id).map(|c| c.clone())
    }

    async fn delete_connection(&self, connection_id: &str) -> Option<Connection> {
        self.connections.remove(connection_id).map(|(_, c)| c)
    }

    async fn touch_connection(&self, connection_id: &str, now_ms: i64) {
        if let Some(mut entry) = self.connections.get_mut(connection_id) {
            entry.touch(now_ms);
        }
    }

    async fn set_target_language(&self, connection_id: &str, language: &str) -> bool {
        match self.connections.get_mut(connection_id) {
            Some(mut entry) => {
                entry.target_language = Some(language.to_string());
                true
            }
            None => false,
        }
    }

    async fn get_listeners_by_language(&self, session_id: &str, language: &str) -> Vec<String> {
        self.connections
            .iter()
            .filter(|entry| {
                entry.session_id == session_id
                    && entry.role == Role::Listener
                    && entry.target_language.as_deref() == Some(language)
            })
            .map(|entry| entry.connection_id.clone())
            .collect()
    }

    async fn get_unique_target_languages(&self, session_id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.connections
            .iter()
            .filter(|entry| entry.session_id == session_id && entry.role == Role::Listener)
            .filter_map(|entry| entry.target_language.clone())
            .filter(|lang| seen.insert(lang.clone()))
            .collect()
    }

    async fn scan_all_connections(&self) -> Vec<Connection> {
        self.connections.iter().map(|entry| entry.clone()).collect()
    }

    async fn batch_delete(&self, connection_ids: &[String]) -> Vec<String> {
        for id in connection_ids {
            self.connections.remove(id);
        }
        Vec::new()
    }

    async fn count_for_session(&self, session_id: &str, role: Role) -> u32 {
        self.connections
            .iter()
            .filter(|entry| entry.session_id == session_id && entry.role == role)
            .count() as u32
    }
}
