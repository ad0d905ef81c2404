use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use warden_auth::{ResourceKind, Session};
use warden_core::{SessionId, UserId};

use crate::StoreError;

/// Session persistence, supplied by the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session. Keys must be unique across live sessions.
    async fn create_session(
        &self,
        user_id: UserId,
        key: String,
        api_only: bool,
        now: DateTime<Utc>,
    ) -> Result<Session, StoreError>;

    async fn session_by_key(&self, key: &str) -> Result<Option<Session>, StoreError>;

    async fn session_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    async fn list_sessions_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError>;

    /// Remove the session permanently. `NotFound` if it is already gone.
    async fn destroy_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Remove every session of `user_id`, returning how many were removed.
    async fn destroy_all_sessions_for_user(&self, user_id: UserId) -> Result<usize, StoreError>;

    /// Persist `session.accessed_at`.
    async fn mark_session_accessed(&self, session: &Session) -> Result<(), StoreError>;

    /// Remove non-API sessions last accessed before `cutoff`.
    async fn destroy_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[async_trait]
impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    async fn create_session(
        &self,
        user_id: UserId,
        key: String,
        api_only: bool,
        now: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        (**self).create_session(user_id, key, api_only, now).await
    }

    async fn session_by_key(&self, key: &str) -> Result<Option<Session>, StoreError> {
        (**self).session_by_key(key).await
    }

    async fn session_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        (**self).session_by_id(id).await
    }

    async fn list_sessions_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        (**self).list_sessions_for_user(user_id).await
    }

    async fn destroy_session(&self, session: &Session) -> Result<(), StoreError> {
        (**self).destroy_session(session).await
    }

    async fn destroy_all_sessions_for_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        (**self).destroy_all_sessions_for_user(user_id).await
    }

    async fn mark_session_accessed(&self, session: &Session) -> Result<(), StoreError> {
        (**self).mark_session_accessed(session).await
    }

    async fn destroy_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        (**self).destroy_expired_sessions(cutoff).await
    }
}

#[derive(Debug, Default)]
struct Sessions {
    next_id: u64,
    by_id: HashMap<SessionId, Session>,
}

/// In-memory session store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Sessions>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert a fully-formed session (fixtures with a chosen `accessed_at`).
    pub async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.by_id.values().any(|s| s.key == session.key) {
            return Err(StoreError::Conflict("session key already in use".to_string()));
        }
        inner.next_id = inner.next_id.max(session.id.get());
        inner.by_id.insert(session.id, session);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        user_id: UserId,
        key: String,
        api_only: bool,
        now: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.by_id.values().any(|s| s.key == key) {
            return Err(StoreError::Conflict("session key already in use".to_string()));
        }
        inner.next_id += 1;
        let session = Session {
            id: SessionId::new(inner.next_id),
            user_id,
            key,
            created_at: now,
            accessed_at: now,
            api_only,
        };
        inner.by_id.insert(session.id, session.clone());
        Ok(session)
    }

    async fn session_by_key(&self, key: &str) -> Result<Option<Session>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.values().find(|s| s.key == key).cloned())
    }

    async fn session_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn list_sessions_for_user(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<_> = inner
            .by_id
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.id);
        Ok(sessions)
    }

    async fn destroy_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.by_id.remove(&session.id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                kind: ResourceKind::Session,
                id: session.id.get(),
            }),
        }
    }

    async fn destroy_all_sessions_for_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.by_id.len();
        inner.by_id.retain(|_, s| s.user_id != user_id);
        Ok(before - inner.by_id.len())
    }

    async fn mark_session_accessed(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.by_id.get_mut(&session.id).ok_or(StoreError::NotFound {
            kind: ResourceKind::Session,
            id: session.id.get(),
        })?;
        stored.mark_accessed(session.accessed_at);
        Ok(())
    }

    async fn destroy_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.by_id.len();
        inner
            .by_id
            .retain(|_, s| s.api_only || s.accessed_at >= cutoff);
        Ok(before - inner.by_id.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn create_assigns_ids_and_rejects_duplicate_keys() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let a = store.create_session(UserId::new(1), "k1".into(), false, now).await.unwrap();
        let b = store.create_session(UserId::new(1), "k2".into(), true, now).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.accessed_at, now);

        let err = store
            .create_session(UserId::new(2), "k1".into(), false, now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn destroyed_session_is_gone_for_good() {
        let store = InMemorySessionStore::new();
        let s = store
            .create_session(UserId::new(1), "k".into(), false, Utc::now())
            .await
            .unwrap();
        store.destroy_session(&s).await.unwrap();
        assert!(store.session_by_key("k").await.unwrap().is_none());
        assert!(matches!(
            store.destroy_session(&s).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.mark_session_accessed(&s).await.is_err());
    }

    #[tokio::test]
    async fn expired_sweep_keeps_api_only_sessions() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let old = now - Duration::days(3);
        store.create_session(UserId::new(1), "old".into(), false, old).await.unwrap();
        store.create_session(UserId::new(1), "api".into(), true, old).await.unwrap();
        store.create_session(UserId::new(1), "fresh".into(), false, now).await.unwrap();

        let removed = store.destroy_expired_sessions(now - Duration::days(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.session_by_key("old").await.unwrap().is_none());
        assert!(store.session_by_key("api").await.unwrap().is_some());
        assert_eq!(store.len().await, 2);
    }
}
