//! Tracing/logging initialization.
//!
//! JSON lines by default; filter taken from `RUST_LOG` (default `info`).

use anyhow::bail;
use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "WARDEN_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObservabilityConfig {
    pub format: LogFormat,
}

impl ObservabilityConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let format = match lookup(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("") | Some("json") => LogFormat::Json,
            Some("pretty") | Some("text") => LogFormat::Pretty,
            Some(other) => bail!("{LOG_FORMAT_ENV}: unknown log format '{other}'"),
        };
        Ok(Self { format })
    }
}

/// Initialize tracing with the default (JSON) configuration.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(&ObservabilityConfig::default());
}

/// Initialize tracing for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_with(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    // A subscriber may already be installed (tests, embedding binaries).
    let _ = match config.format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.with_target(true).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_format() {
        let json = ObservabilityConfig::from_lookup(|_| None).unwrap();
        assert_eq!(json.format, LogFormat::Json);

        let pretty = ObservabilityConfig::from_lookup(|_| Some("pretty".to_string())).unwrap();
        assert_eq!(pretty.format, LogFormat::Pretty);

        assert!(ObservabilityConfig::from_lookup(|_| Some("xml".to_string())).is_err());
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init_with(&ObservabilityConfig {
            format: LogFormat::Pretty,
        });
    }
}
