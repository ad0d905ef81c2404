//! Background workers.

pub mod session_reaper;

pub use session_reaper::{ReaperHandle, SessionReaper};
