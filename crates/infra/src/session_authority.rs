//! Session validation, expiry, and lifecycle.
//!
//! Expiry is checked lazily when a key is presented: an idle non-API
//! session is destroyed at that moment. [`crate::workers::SessionReaper`]
//! may sweep unused sessions for storage hygiene, but this check is what
//! keeps expired keys from being accepted.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info};

use warden_auth::{Action, ResourceDescriptor, ResourceKind, Session, Subject, authorize};
use warden_core::{SessionId, UserId};

use crate::{AuthConfig, ServiceError, ServiceResult, SessionStore, StoreError};

const SESSION_KEY_LEN: usize = 48;

/// High-entropy session key from the thread-local CSPRNG.
pub fn generate_session_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_KEY_LEN)
        .map(char::from)
        .collect()
}

pub struct SessionAuthority<S> {
    store: S,
    config: AuthConfig,
}

impl<S: SessionStore> SessionAuthority<S> {
    pub fn new(store: S, config: AuthConfig) -> Self {
        Self { store, config }
    }

    pub fn session_duration(&self) -> Duration {
        self.config.session_duration
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a session for `user_id` (called by the login flow).
    pub async fn create(&self, user_id: UserId, api_only: bool) -> ServiceResult<Session> {
        let session = self
            .store
            .create_session(user_id, generate_session_key(), api_only, Utc::now())
            .await
            .map_err(|e| ServiceError::store(format!("creating session for user {user_id}"), e))?;
        debug!(session_id = %session.id, user_id = %user_id, api_only, "session created");
        Ok(session)
    }

    /// Validate a presented key, refreshing its access time.
    ///
    /// An expired non-API session is destroyed and reported as
    /// `AuthRequired`; it can never validate again.
    pub async fn validate_by_key(&self, key: &str) -> ServiceResult<Session> {
        self.validate_by_key_at(key, Utc::now()).await
    }

    pub(crate) async fn validate_by_key_at(&self, key: &str, now: DateTime<Utc>) -> ServiceResult<Session> {
        if key.is_empty() {
            return Err(ServiceError::auth_required("missing session key"));
        }

        let mut session = self
            .store
            .session_by_key(key)
            .await
            .map_err(|e| ServiceError::store("looking up session by key", e))?
            .ok_or_else(|| ServiceError::auth_required("invalid session key"))?;

        if let Err(expired) = session.validate(now, self.config.session_duration) {
            self.store
                .destroy_session(&session)
                .await
                .map_err(|e| write_back_failed(format!("destroying expired session {}", session.id), e))?;
            info!(
                session_id = %session.id,
                user_id = %session.user_id,
                reason = %expired,
                "expired session destroyed"
            );
            return Err(ServiceError::auth_required("expired session"));
        }

        session.mark_accessed(now);
        self.store
            .mark_session_accessed(&session)
            .await
            .map_err(|e| write_back_failed(format!("marking session {} accessed", session.id), e))?;
        Ok(session)
    }

    /// Load a session by id for session-management views (no access refresh).
    ///
    /// Only the owner or a global admin may see it.
    pub async fn validate_by_id(&self, id: SessionId, subject: &Subject) -> ServiceResult<Session> {
        let session = self
            .store
            .session_by_id(id)
            .await
            .map_err(|e| ServiceError::store(format!("loading session {id}"), e))?
            .ok_or(ServiceError::NotFound {
                kind: ResourceKind::Session,
                id: id.get(),
            })?;
        authorize(subject, &session, Action::Read)?;
        Ok(session)
    }

    /// All live sessions of `user_id`, each with its own `accessed_at`.
    pub async fn list_for_user(&self, user_id: UserId, subject: &Subject) -> ServiceResult<Vec<Session>> {
        authorize(subject, &ResourceDescriptor::sessions_of(user_id), Action::Read)?;
        self.store
            .list_sessions_for_user(user_id)
            .await
            .map_err(|e| ServiceError::store(format!("listing sessions for user {user_id}"), e))
    }

    /// Destroy `session`; its key never validates again.
    ///
    /// Destroying an already-destroyed session fails with `NotFound`.
    pub async fn destroy(&self, session: &Session, subject: &Subject) -> ServiceResult<()> {
        authorize(subject, session, Action::Write)?;
        self.store
            .destroy_session(session)
            .await
            .map_err(|e| ServiceError::store(format!("destroying session {}", session.id), e))?;
        debug!(session_id = %session.id, actor = %subject.user_id, "session destroyed");
        Ok(())
    }

    /// Destroy every session of `user_id` (e.g. after a password change).
    pub async fn destroy_all_for_user(&self, user_id: UserId, subject: &Subject) -> ServiceResult<usize> {
        authorize(subject, &ResourceDescriptor::sessions_of(user_id), Action::Write)?;
        let removed = self
            .store
            .destroy_all_sessions_for_user(user_id)
            .await
            .map_err(|e| ServiceError::store(format!("destroying sessions for user {user_id}"), e))?;
        info!(user_id = %user_id, actor = %subject.user_id, removed, "all sessions destroyed");
        Ok(removed)
    }

    /// Sweep sessions that would fail validation at `now`.
    pub async fn reap_expired(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        let Some(cutoff) = now.checked_sub_signed(self.config.session_duration) else {
            debug!("session duration reaches past the earliest timestamp; nothing can be expired");
            return Ok(0);
        };
        self.store
            .destroy_expired_sessions(cutoff)
            .await
            .map_err(|e| ServiceError::store("sweeping expired sessions", e))
    }
}

/// The session vanished between lookup and write-back (concurrent logout or
/// sweep): the key is no longer valid.
fn write_back_failed(context: String, source: StoreError) -> ServiceError {
    match source {
        StoreError::NotFound { .. } => ServiceError::auth_required("invalid session key"),
        source => ServiceError::store(context, source),
    }
}
