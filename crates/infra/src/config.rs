//! Configuration consumed by the session authority and its reaper.

use anyhow::{Context, bail};
use chrono::Duration;

pub const SESSION_DURATION_ENV: &str = "WARDEN_SESSION_DURATION";
pub const REAPER_ENABLED_ENV: &str = "WARDEN_SESSION_REAPER_ENABLED";
pub const REAPER_INTERVAL_ENV: &str = "WARDEN_SESSION_REAPER_INTERVAL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    /// Idle window for non-API sessions.
    pub session_duration: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::hours(24),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(SESSION_DURATION_ENV) {
            config.session_duration =
                parse_duration(&raw).with_context(|| format!("parsing {SESSION_DURATION_ENV}"))?;
        }
        Ok(config)
    }
}

/// Background sweep of expired sessions (storage hygiene only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    pub enabled: bool,
    pub interval: std::time::Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: std::time::Duration::from_secs(3600),
        }
    }
}

impl ReaperConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(REAPER_ENABLED_ENV) {
            config.enabled = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => bail!("{REAPER_ENABLED_ENV}: expected a boolean, got '{other}'"),
            };
        }
        if let Some(raw) = lookup(REAPER_INTERVAL_ENV) {
            let interval =
                parse_duration(&raw).with_context(|| format!("parsing {REAPER_INTERVAL_ENV}"))?;
            config.interval = interval
                .to_std()
                .with_context(|| format!("{REAPER_INTERVAL_ENV} out of range"))?;
        }
        Ok(config)
    }
}

/// Parse `"90m"`, `"24h"`, `"5d"`, `"30s"` or plain seconds. Must be positive.
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: i64 = digits
        .parse()
        .with_context(|| format!("invalid duration '{raw}'"))?;

    let duration = match unit.trim() {
        "" | "s" => Duration::try_seconds(value),
        "m" => Duration::try_minutes(value),
        "h" => Duration::try_hours(value),
        "d" => Duration::try_days(value),
        other => bail!("invalid duration unit '{other}' in '{raw}'"),
    }
    .with_context(|| format!("duration '{raw}' out of range"))?;

    if duration <= Duration::zero() {
        bail!("duration '{raw}' must be positive");
    }
    Ok(duration)
}
