//! Policy resource: team-scoped (or global) compliance checks.

pub mod policy;

pub use policy::{ModifyPolicyPayload, Policy, PolicyPayload, SUPPORTED_PLATFORMS};
