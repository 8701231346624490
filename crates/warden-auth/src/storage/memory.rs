//! In-memory session store.
//!
//! Sessions live in a `DashMap` keyed by id. Every mutation goes through
//! `get_mut`, which holds the shard lock for the duration of the
//! read-modify-write, so operations on one session are linearizable.

use async_trait::async_trait;
use dashmap::DashMap;
use time::Duration;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::{AuthError, CannotRefreshReason};
use crate::storage::session::SessionStore;
use crate::types::session::{Identity, Session, SessionValidity};

/// Session store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a prebuilt session, replacing any session with the same id.
    ///
    /// Useful for seeding and for tests that need sessions with
    /// specific timestamps.
    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    /// Returns the number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, identity: &Identity, max_age: Duration) -> AuthResult<Session> {
        let session = Session::try_new(identity.clone(), max_age)?;
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, session_id: Uuid) -> AuthResult<Session> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AuthError::session_not_found(session_id))
    }

    async fn revoke(&self, session_id: Uuid) -> AuthResult<()> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AuthError::session_not_found(session_id))?;
        entry.revoke();
        Ok(())
    }

    async fn list_by_identity(&self, identity: &Identity) -> AuthResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| &entry.identity == identity)
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn advance_refresh_generation(
        &self,
        session_id: Uuid,
        expected: u64,
    ) -> AuthResult<Session> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AuthError::session_not_found(session_id))?;
        match entry.validity() {
            SessionValidity::Valid => {}
            SessionValidity::Revoked => {
                return Err(AuthError::cannot_refresh(CannotRefreshReason::Revoked));
            }
            SessionValidity::Expired => {
                return Err(AuthError::cannot_refresh(CannotRefreshReason::SessionExpired));
            }
        }
        if entry.refresh_generation != expected {
            return Err(AuthError::cannot_refresh(CannotRefreshReason::TokenReused));
        }
        entry.refresh_generation += 1;
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemorySessionStore::new();
        let session = store
            .create(&Identity::new("alice"), Duration::days(7))
            .await
            .unwrap();

        assert!(!session.revoked);
        assert!(store.is_valid(&session));

        let fetched = store.get(session.id).await.unwrap();
        assert_eq!(fetched, session);
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let store = InMemorySessionStore::new();
        let id = Uuid::new_v4();
        let err = store.get(id).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound { session_id } if session_id == id));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = InMemorySessionStore::new();
        let session = store
            .create(&Identity::new("alice"), Duration::days(7))
            .await
            .unwrap();

        store.revoke(session.id).await.unwrap();
        let first = store.get(session.id).await.unwrap();
        store.revoke(session.id).await.unwrap();
        let second = store.get(session.id).await.unwrap();

        assert!(first.revoked);
        assert_eq!(first.revoked_at, second.revoked_at);
        assert!(!store.is_valid(&second));
    }

    #[tokio::test]
    async fn test_revoke_unknown_session() {
        let store = InMemorySessionStore::new();
        let err = store.revoke(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_revokes_commute() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store
            .create(&Identity::new("alice"), Duration::days(7))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let session_id = session.id;
            handles.push(tokio::spawn(
                async move { store.revoke(session_id).await },
            ));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(store.get(session.id).await.unwrap().revoked);
    }

    #[tokio::test]
    async fn test_list_by_identity_most_recent_first() {
        let store = InMemorySessionStore::new();
        let alice = Identity::new("alice");

        let mut older = Session::new(alice.clone(), Duration::days(7));
        older.created_at -= Duration::hours(2);
        let mut newest = Session::new(alice.clone(), Duration::days(7));
        newest.created_at += Duration::seconds(1);
        let middle = Session::new(alice.clone(), Duration::days(7));
        let other = Session::new(Identity::new("bob"), Duration::days(7));

        for session in [older.clone(), newest.clone(), middle.clone(), other] {
            store.insert(session);
        }

        let listed = store.list_by_identity(&alice).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newest.id, middle.id, older.id]);

        let nobody = store.list_by_identity(&Identity::new("carol")).await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_advance_refresh_generation() {
        let store = InMemorySessionStore::new();
        let session = store
            .create(&Identity::new("alice"), Duration::days(7))
            .await
            .unwrap();

        let advanced = store.advance_refresh_generation(session.id, 0).await.unwrap();
        assert_eq!(advanced.refresh_generation, 1);

        let err = store
            .advance_refresh_generation(session.id, 0)
            .await
            .unwrap_err();
        assert_eq!(
            err.cannot_refresh_reason(),
            Some(CannotRefreshReason::TokenReused)
        );
    }

    #[tokio::test]
    async fn test_advance_rejects_dead_sessions() {
        let store = InMemorySessionStore::new();
        let session = store
            .create(&Identity::new("alice"), Duration::days(7))
            .await
            .unwrap();

        store.revoke(session.id).await.unwrap();
        let err = store
            .advance_refresh_generation(session.id, 0)
            .await
            .unwrap_err();
        assert_eq!(err.cannot_refresh_reason(), Some(CannotRefreshReason::Revoked));
        assert_eq!(store.get(session.id).await.unwrap().refresh_generation, 0);

        let mut expired = Session::new(Identity::new("alice"), Duration::days(7));
        expired.expires_at = expired.created_at - Duration::seconds(1);
        store.insert(expired.clone());
        let err = store
            .advance_refresh_generation(expired.id, 0)
            .await
            .unwrap_err();
        assert_eq!(
            err.cannot_refresh_reason(),
            Some(CannotRefreshReason::SessionExpired)
        );
    }

    #[tokio::test]
    async fn test_create_with_out_of_range_lifetime() {
        let store = InMemorySessionStore::new();
        let err = store
            .create(&Identity::new("alice"), Duration::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_racing_generation_advances_single_winner() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store
            .create(&Identity::new("alice"), Duration::days(7))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let session_id = session.id;
            handles.push(tokio::spawn(async move {
                store.advance_refresh_generation(session_id, 0).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.get(session.id).await.unwrap().refresh_generation, 1);
    }
}
