//! Public surface for request handlers: session management and gated policy
//! operations over caller-supplied adapters.

pub mod config;
pub mod context;
pub mod credentials;
pub mod service;

pub use config::AppConfig;
pub use context::RequestContext;
pub use credentials::{CredentialVerifier, VerifiedUser};
pub use service::{Service, TeamPolicies};
