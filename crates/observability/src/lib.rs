//! Tracing/logging setup shared by every binary embedding the service.

pub mod tracing;

pub use crate::tracing::{LOG_FORMAT_ENV, LogFormat, ObservabilityConfig, init, init_with};
