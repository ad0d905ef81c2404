use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::{Authorizable, ResourceKind};
use warden_core::{DomainError, DomainResult, PolicyId, TeamId, UserId};

/// Platforms a policy may target.
pub const SUPPORTED_PLATFORMS: [&str; 4] = ["darwin", "windows", "linux", "chrome"];

/// A stored policy.
///
/// `team_id == None` denotes a global policy, inherited by every team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub team_id: Option<TeamId>,
    pub name: String,
    pub query: String,
    pub description: String,
    pub resolution: Option<String>,
    /// Comma-separated platform list; empty means all platforms.
    pub platform: String,
    pub author_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Authorizable for Policy {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Policy
    }

    fn resource_id(&self) -> Option<u64> {
        Some(self.id.get())
    }

    fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }
}

/// Payload for creating a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPayload {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub platform: String,
}

impl PolicyPayload {
    pub fn verify(&self) -> DomainResult<()> {
        verify_name(&self.name)?;
        verify_query(&self.query)?;
        verify_platform(&self.platform)
    }
}

/// Partial update: only fields that are present are applied.
///
/// A present-but-empty field overwrites the stored value (subject to
/// validation, so an empty name or query is rejected).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyPolicyPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

impl ModifyPolicyPayload {
    pub fn verify(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            verify_name(name)?;
        }
        if let Some(query) = &self.query {
            verify_query(query)?;
        }
        if let Some(platform) = &self.platform {
            verify_platform(platform)?;
        }
        Ok(())
    }

    /// Apply present fields onto `policy`. Call [`verify`](Self::verify) first.
    pub fn apply_to(&self, policy: &mut Policy, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            policy.name = name.clone();
        }
        if let Some(description) = &self.description {
            policy.description = description.clone();
        }
        if let Some(query) = &self.query {
            policy.query = query.clone();
        }
        if let Some(resolution) = &self.resolution {
            policy.resolution = Some(resolution.clone());
        }
        if let Some(platform) = &self.platform {
            policy.platform = platform.clone();
        }
        policy.updated_at = now;
    }
}

fn verify_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("policy name cannot be empty"));
    }
    Ok(())
}

fn verify_query(query: &str) -> DomainResult<()> {
    if query.trim().is_empty() {
        return Err(DomainError::validation("policy query cannot be empty"));
    }
    Ok(())
}

fn verify_platform(platform: &str) -> DomainResult<()> {
    if platform.trim().is_empty() {
        return Ok(());
    }
    for entry in platform.split(',') {
        let entry = entry.trim();
        if !SUPPORTED_PLATFORMS.contains(&entry) {
            return Err(DomainError::validation(format!(
                "policy platform '{entry}' is not supported (expected one of: {})",
                SUPPORTED_PLATFORMS.join(", ")
            )));
        }
    }
    Ok(())
}
