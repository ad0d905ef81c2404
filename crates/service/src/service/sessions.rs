use tracing::info;

use warden_auth::{Session, Subject};
use warden_core::{SessionId, UserId};
use warden_infra::{ServiceError, ServiceResult};

use super::Service;
use crate::RequestContext;

impl Service {
    /// Exchange credentials for a fresh session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let verified = self
            .credentials
            .verify(email, password)
            .await
            .map_err(|e| ServiceError::store("verifying credentials", e))?;
        let Some(user) = verified else {
            info!("login rejected");
            return Err(ServiceError::auth_required("invalid credentials"));
        };
        let session = self.sessions.create(user.user_id, user.api_only).await?;
        info!(user_id = %user.user_id, session_id = %session.id, "login succeeded");
        Ok(session)
    }

    /// Destroy the session behind `key`. An expired key is already gone and
    /// reports `AuthRequired`.
    pub async fn logout(&self, key: &str) -> ServiceResult<()> {
        let session = self.sessions.validate_by_key(key).await?;
        let owner = Subject::new(session.user_id);
        self.sessions.destroy(&session, &owner).await
    }

    /// Resolve a presented key to its live session, refreshing access time.
    pub async fn session_by_key(&self, key: &str) -> ServiceResult<Session> {
        self.sessions.validate_by_key(key).await
    }

    pub async fn session_info(&self, ctx: &RequestContext, id: SessionId) -> ServiceResult<Session> {
        self.sessions.validate_by_id(id, ctx.viewer()).await
    }

    pub async fn sessions_for_user(&self, ctx: &RequestContext, user_id: UserId) -> ServiceResult<Vec<Session>> {
        self.sessions.list_for_user(user_id, ctx.viewer()).await
    }

    pub async fn delete_session(&self, ctx: &RequestContext, id: SessionId) -> ServiceResult<()> {
        let session = self.sessions.validate_by_id(id, ctx.viewer()).await?;
        self.sessions.destroy(&session, ctx.viewer()).await
    }

    /// Returns how many sessions were destroyed.
    pub async fn destroy_all_sessions_for_user(&self, ctx: &RequestContext, user_id: UserId) -> ServiceResult<usize> {
        self.sessions.destroy_all_for_user(user_id, ctx.viewer()).await
    }
}
