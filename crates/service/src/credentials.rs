use std::sync::Arc;

use async_trait::async_trait;

use warden_core::UserId;
use warden_infra::StoreError;

/// A user whose credentials checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedUser {
    pub user_id: UserId,
    /// API-only users get sessions that never idle out.
    pub api_only: bool,
}

/// Opaque credential check (password hashing lives behind this).
///
/// `Ok(None)` means "not authenticated" without saying whether the email or
/// the password was wrong.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, email: &str, password: &str) -> Result<Option<VerifiedUser>, StoreError>;
}

#[async_trait]
impl<V> CredentialVerifier for Arc<V>
where
    V: CredentialVerifier + ?Sized,
{
    async fn verify(&self, email: &str, password: &str) -> Result<Option<VerifiedUser>, StoreError> {
        (**self).verify(email, password).await
    }
}
