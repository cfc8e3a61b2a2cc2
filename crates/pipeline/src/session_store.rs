//! In-memory Session Store (C13).
//!
//! Every mutating operation here must be atomic with respect to the
//! `DashMap` entry it touches; nothing does a plain read-then-write across
//! two calls against shared state.

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{BroadcastState, CoreError, Session, SessionStore};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: Session) -> Result<(), CoreError> {
        use dashmap::mapref::entry::Entry;
        match self.sessions.entry(session.session_id.clone()) {
            Entry::Occupied(_) => Err(CoreError::AlreadyExists(format!(
                "session {} already exists",
                session.session_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    async fn get_session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    async fn increment_listener_count(&self, session_id: &str) -> Result<u32, CoreError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::NotFound(format!("session {session_id} not found")))?;
        if !entry.is_active {
            return Err(CoreError::Validation(format!("session {session_id} is inactive")));
        }
        entry.listener_count += 1;
        Ok(entry.listener_count)
    }

    async fn decrement_listener_count(&self, session_id: &str) -> u32 {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                entry.listener_count = entry.listener_count.saturating_sub(1);
                entry.listener_count
            }
            None => 0,
        }
    }

    async fn get_listener_count(&self, session_id: &str) -> u32 {
        self.sessions.get(session_id).map(|s| s.listener_count).unwrap_or(0)
    }

    async fn update_speaker_connection(
        &self,
        session_id: &str,
        new_connection_id: &str,
    ) -> Result<(), CoreError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::NotFound(format!("session {session_id} not found")))?;
        if !entry.is_active {
            return Err(CoreError::Validation(format!("session {session_id} is inactive")));
        }
        entry.speaker_connection_id = new_connection_id.to_string();
        Ok(())
    }

    async fn update_broadcast_state(&self, session_id: &str, state: BroadcastState) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.broadcast_state = state;
        }
    }

    async fn mark_inactive(&self, session_id: &str) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.is_active = false;
        }
    }

    async fn list_active_sessions(&self) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|entry| entry.is_active)
            .map(|entry| entry.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> Session {
        Session::new(
            id.to_string(),
            "conn-1".to_string(),
            "user-1".to_string(),
            "en".to_string(),
            "standard".to_string(),
            0,
            4,
            true,
            0.8,
            5,
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        store.create_session(session("s1")).await.unwrap();
        assert!(store.get_session("s1").await.is_some());
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let store = InMemorySessionStore::new();
        store.create_session(session("s1")).await.unwrap();
        assert!(store.create_session(session("s1")).await.is_err());
    }

    #[tokio::test]
    async fn increment_requires_active_session() {
        let store = InMemorySessionStore::new();
        store.create_session(session("s1")).await.unwrap();
        store.mark_inactive("s1").await;
        assert!(store.increment_listener_count("s1").await.is_err());
    }

    #[tokio::test]
    async fn decrement_floors_at_zero() {
        let store = InMemorySessionStore::new();
        store.create_session(session("s1")).await.unwrap();
        assert_eq!(store.decrement_listener_count("s1").await, 0);
        store.increment_listener_count("s1").await.unwrap();
        assert_eq!(store.decrement_listener_count("s1").await, 0);
    }

    #[tokio::test]
    async fn decrement_on_missing_session_is_zero() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.decrement_listener_count("missing").await, 0);
    }

    #[tokio::test]
    async fn list_active_sessions_excludes_inactive() {
        let store = InMemorySessionStore::new();
        store.create_session(session("s1")).await.unwrap();
        store.create_session(session("s2")).await.unwrap();
        store.mark_inactive("s2").await;

        let active = store.list_active_sessions().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id, "s1");
    }
}
