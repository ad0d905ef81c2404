//! Infrastructure layer: adapter contracts, in-memory adapters, config, and
//! the orchestration that composes them (session authority, mutation gate).

pub mod audit;
pub mod config;
pub mod error;
pub mod mutation_gate;
pub mod session_authority;
pub mod store;
pub mod workers;

pub use audit::{ActivitySink, InMemoryActivityLog};
pub use config::{AuthConfig, ReaperConfig};
pub use error::{AuditError, ServiceError, ServiceResult, StoreError};
pub use mutation_gate::{MutationGate, check_access};
pub use session_authority::SessionAuthority;
pub use store::{InMemoryPolicyStore, InMemorySessionStore, PolicyStore, SessionStore};
