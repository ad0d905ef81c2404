use anyhow::Context;

use warden_infra::{AuthConfig, ReaperConfig};
use warden_observability::ObservabilityConfig;

/// Everything the process reads from its environment at startup.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub reaper: ReaperConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            auth: AuthConfig::from_lookup(&lookup).context("loading auth config")?,
            reaper: ReaperConfig::from_lookup(&lookup).context("loading session reaper config")?,
            observability: ObservabilityConfig::from_lookup(&lookup)
                .context("loading observability config")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use warden_observability::LogFormat;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.auth.session_duration, chrono::Duration::hours(24));
        assert!(!config.reaper.enabled);
        assert_eq!(config.observability.format, LogFormat::Json);
    }

    #[test]
    fn reads_every_section() {
        let config = AppConfig::from_lookup(lookup(&[
            ("WARDEN_SESSION_DURATION", "90m"),
            ("WARDEN_SESSION_REAPER_ENABLED", "true"),
            ("WARDEN_SESSION_REAPER_INTERVAL", "5m"),
            ("WARDEN_LOG_FORMAT", "pretty"),
        ]))
        .unwrap();
        assert_eq!(config.auth.session_duration, chrono::Duration::minutes(90));
        assert!(config.reaper.enabled);
        assert_eq!(config.reaper.interval, std::time::Duration::from_secs(300));
        assert_eq!(config.observability.format, LogFormat::Pretty);
    }

    #[test]
    fn bad_value_names_the_section() {
        let err = AppConfig::from_lookup(lookup(&[("WARDEN_SESSION_DURATION", "-5")])).unwrap_err();
        assert!(format!("{err:#}").contains("loading auth config"));
    }
}
