use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use warden_core::UserId;

/// Free-form detail mapping attached to an activity (e.g. policy id and name).
pub type ActivityDetails = Map<String, JsonValue>;

/// Stable activity type identifiers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    CreatedPolicy,
    EditedPolicy,
    DeletedPolicy,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::CreatedPolicy => "created_policy",
            ActivityType::EditedPolicy => "edited_policy",
            ActivityType::DeletedPolicy => "deleted_policy",
        }
    }
}

impl core::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record: who did what, with details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: Uuid,
    pub actor: UserId,
    pub activity_type: ActivityType,
    pub details: ActivityDetails,
    pub recorded_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(actor: UserId, activity_type: ActivityType, recorded_at: DateTime<Utc>) -> Self {
        Self {
            activity_id: Uuid::now_v7(),
            actor,
            activity_type,
            details: Map::new(),
            recorded_at,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&JsonValue> {
        self.details.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_type_as_snake_case() {
        let a = Activity::new(UserId::new(1), ActivityType::DeletedPolicy, Utc::now())
            .with_detail("policy_id", 3u64)
            .with_detail("policy_name", "disk encryption");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["activity_type"], "deleted_policy");
        assert_eq!(json["details"]["policy_id"], 3);
        assert_eq!(a.detail("policy_name").and_then(|v| v.as_str()), Some("disk encryption"));
    }
}
