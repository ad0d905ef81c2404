use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use warden_core::{SessionId, UserId};

use crate::{Authorizable, HasOwner, ResourceKind};

/// A server-held record binding a secret key to a user.
///
/// The key is never serialized and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub key: String,
    pub created_at: DateTime<Utc>,
    /// Last successful validation. Never moves backwards.
    pub accessed_at: DateTime<Utc>,
    /// Machine-to-machine sessions are exempt from idle expiry.
    pub api_only: bool,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("key", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("accessed_at", &self.accessed_at)
            .field("api_only", &self.api_only)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session idle for {idle_secs}s, limit is {limit_secs}s")]
    Expired { idle_secs: i64, limit_secs: i64 },
}

impl Session {
    /// Idle time since the last successful validation (never negative).
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.accessed_at).max(Duration::zero())
    }

    /// Whether the session has been idle longer than `session_duration`.
    ///
    /// API-only sessions never expire.
    pub fn is_expired(&self, now: DateTime<Utc>, session_duration: Duration) -> bool {
        !self.api_only && self.idle_for(now) > session_duration
    }

    /// Deterministically validate the session against the idle window.
    pub fn validate(
        &self,
        now: DateTime<Utc>,
        session_duration: Duration,
    ) -> Result<(), SessionValidationError> {
        if self.is_expired(now, session_duration) {
            return Err(SessionValidationError::Expired {
                idle_secs: self.idle_for(now).num_seconds(),
                limit_secs: session_duration.num_seconds(),
            });
        }
        Ok(())
    }

    /// Refresh the access time, keeping it monotonically non-decreasing.
    pub fn mark_accessed(&mut self, now: DateTime<Utc>) {
        if now > self.accessed_at {
            self.accessed_at = now;
        }
    }
}

impl HasOwner for Session {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

impl Authorizable for Session {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Session
    }

    fn resource_id(&self) -> Option<u64> {
        Some(self.id.get())
    }

    fn ownership(&self) -> Option<&dyn HasOwner> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResourceDescriptor, Role, Subject, authorize, Action};

    fn session(accessed_at: DateTime<Utc>, api_only: bool) -> Session {
        Session {
            id: SessionId::new(1),
            user_id: UserId::new(999),
            key: "abc".to_string(),
            created_at: accessed_at,
            accessed_at,
            api_only,
        }
    }

    #[test]
    fn real_user_session_expires_after_window() {
        let now = Utc::now();
        let day = Duration::hours(24);
        assert!(session(now - Duration::hours(1), false).validate(now, day).is_ok());

        let err = session(now - Duration::hours(25), false)
            .validate(now, day)
            .unwrap_err();
        assert_eq!(
            err,
            SessionValidationError::Expired {
                idle_secs: 25 * 3600,
                limit_secs: 24 * 3600
            }
        );
    }

    #[test]
    fn exactly_at_window_is_still_valid() {
        let now = Utc::now();
        let day = Duration::hours(24);
        assert!(!session(now - day, false).is_expired(now, day));
    }

    #[test]
    fn api_only_session_never_expires() {
        let now = Utc::now();
        let s = session(now - Duration::days(400), true);
        assert!(!s.is_expired(now, Duration::hours(24)));
    }

    #[test]
    fn mark_accessed_never_moves_backwards() {
        let now = Utc::now();
        let mut s = session(now, false);
        s.mark_accessed(now - Duration::minutes(5));
        assert_eq!(s.accessed_at, now);
        s.mark_accessed(now + Duration::minutes(5));
        assert_eq!(s.accessed_at, now + Duration::minutes(5));
    }

    #[test]
    fn debug_and_json_hide_key() {
        let s = session(Utc::now(), false);
        assert!(!format!("{s:?}").contains("abc"));
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("key").is_none());
        assert_eq!(json["user_id"], 999);
    }

    #[test]
    fn session_is_owned_by_its_user() {
        let s = session(Utc::now(), false);
        assert_eq!(ResourceDescriptor::of(&s).owner_id, Some(UserId::new(999)));
        assert!(authorize(&Subject::new(UserId::new(999)), &s, Action::Write).is_ok());
        let maintainer = Subject::new(UserId::new(111)).with_global_role(Role::Maintainer);
        assert!(authorize(&maintainer, &s, Action::Read).is_err());
    }
}
