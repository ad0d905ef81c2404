//! Store adapter contracts and in-memory implementations for tests/dev.
//!
//! Adapters own their concurrency control; callers hold no locks.

pub mod policy;
pub mod session;

pub use policy::{InMemoryPolicyStore, PolicyStore};
pub use session::{InMemorySessionStore, SessionStore};
