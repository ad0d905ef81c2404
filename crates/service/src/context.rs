use warden_auth::Subject;
use warden_core::UserId;

/// Authenticated viewer attached to a request.
///
/// Built upstream (after the session key validated and the user's roles were
/// resolved) and immutable for the lifetime of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    viewer: Subject,
}

impl RequestContext {
    pub fn new(viewer: Subject) -> Self {
        Self { viewer }
    }

    pub fn viewer(&self) -> &Subject {
        &self.viewer
    }

    pub fn user_id(&self) -> UserId {
        self.viewer.user_id
    }
}

impl From<Subject> for RequestContext {
    fn from(viewer: Subject) -> Self {
        Self::new(viewer)
    }
}
