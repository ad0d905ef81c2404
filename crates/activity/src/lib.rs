//! Audit trail facts recorded after committed mutations.
//!
//! Activities are:
//! - **immutable** (treat them as facts)
//! - **append-only** (never edited or removed by this layer)

pub mod activity;

pub use activity::{Activity, ActivityDetails, ActivityType};
