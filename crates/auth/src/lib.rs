//! `warden-auth`: pure authorization boundary.
//!
//! This crate is intentionally decoupled from transport and storage: every
//! decision is a function of the subject, the resource, and the action.

pub mod action;
pub mod authorize;
pub mod principal;
pub mod resource;
pub mod roles;
pub mod session;

pub use action::Action;
pub use authorize::{
    AuthorizationExplanation, Decision, ForbiddenError, Rule, authorize, decide,
    explain_authorization,
};
pub use principal::Subject;
pub use resource::{Authorizable, HasOwner, ResourceDescriptor, ResourceKind};
pub use roles::{Role, RoleScope, role_grants};
pub use session::{Session, SessionValidationError};
