//! Error taxonomy surfaced to request handlers.

use thiserror::Error;

use warden_auth::{ForbiddenError, ResourceKind};
use warden_core::DomainError;

/// Store adapter failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: u64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Audit sink failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("activity sink unavailable: {0}")]
    Unavailable(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Every failure an authorization-gated operation can produce.
///
/// Errors are returned to the immediate caller; nothing here retries.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No valid credential, or the session expired (and was destroyed).
    #[error("authentication required: {reason}")]
    AuthRequired { reason: String },

    /// Valid credential, insufficient rights. Never destroys the session.
    #[error(transparent)]
    Forbidden(#[from] ForbiddenError),

    /// Payload failed domain validation; nothing was mutated.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// Only reported once scope authorization has succeeded.
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: u64 },

    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    /// The mutation is committed but its activity record was not written.
    /// Callers must treat the change as final and reconcile the audit trail.
    #[error("{context}: change committed but activity not recorded: {source}")]
    AuditAfterCommit {
        context: String,
        #[source]
        source: AuditError,
    },
}

impl ServiceError {
    pub fn auth_required(reason: impl Into<String>) -> Self {
        Self::AuthRequired {
            reason: reason.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Wrap a store failure with the step it happened in. A store-level
    /// `NotFound` keeps its meaning rather than becoming a storage failure.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            source => Self::Store {
                context: context.into(),
                source,
            },
        }
    }

    /// HTTP-style status code for transport layers.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::AuthRequired { .. } => 401,
            ServiceError::Forbidden(_) => 403,
            ServiceError::BadRequest { .. } => 400,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Store {
                source: StoreError::Conflict(_),
                ..
            } => 409,
            ServiceError::Store { .. } | ServiceError::AuditAfterCommit { .. } => 500,
        }
    }

    /// Whether the requested change reached storage despite the error.
    pub fn is_committed(&self) -> bool {
        matches!(self, ServiceError::AuditAfterCommit { .. })
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        ServiceError::bad_request(value.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_stays_not_found() {
        let err = ServiceError::store(
            "loading policy",
            StoreError::NotFound {
                kind: ResourceKind::Policy,
                id: 4,
            },
        );
        assert!(matches!(err, ServiceError::NotFound { id: 4, .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn store_failure_keeps_context() {
        let err = ServiceError::store("saving policy 3", StoreError::Storage("disk full".into()));
        assert_eq!(err.to_string(), "saving policy 3: storage error: disk full");
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_committed());
    }

    #[test]
    fn audit_after_commit_is_distinguishable() {
        let err = ServiceError::AuditAfterCommit {
            context: "deleting policy 1".into(),
            source: AuditError::Unavailable("sink down".into()),
        };
        assert!(err.is_committed());
        assert!(err.to_string().contains("change committed"));
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err: ServiceError = DomainError::validation("policy name cannot be empty").into();
        assert_eq!(err.to_string(), "bad request: policy name cannot be empty");
        assert_eq!(err.status_code(), 400);
    }
}
