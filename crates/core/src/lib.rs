//! `warden-core`: shared primitives for the authorization layer.
//!
//! Pure types only: identifiers and the domain validation error. No I/O.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{PolicyId, SessionId, TeamId, UserId};
