#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use warden_auth::{Role, Subject};
use warden_core::{TeamId, UserId};
use warden_infra::{AuthConfig, InMemoryActivityLog, InMemoryPolicyStore, InMemorySessionStore, StoreError};
use warden_policies::PolicyPayload;
use warden_service::{CredentialVerifier, RequestContext, Service, VerifiedUser};

/// Fixed email/password table.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    users: HashMap<String, (String, VerifiedUser)>,
}

impl StaticCredentials {
    pub fn with_user(mut self, email: &str, password: &str, user: VerifiedUser) -> Self {
        self.users.insert(email.to_string(), (password.to_string(), user));
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, email: &str, password: &str) -> Result<Option<VerifiedUser>, StoreError> {
        Ok(self
            .users
            .get(email)
            .filter(|(expected, _)| expected == password)
            .map(|(_, user)| *user))
    }
}

/// A service over in-memory adapters, with the adapters kept for inspection.
pub struct Harness {
    pub service: Service,
    pub sessions: Arc<InMemorySessionStore>,
    pub policies: Arc<InMemoryPolicyStore>,
    pub activity: Arc<InMemoryActivityLog>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_credentials(StaticCredentials::default())
    }

    pub fn with_credentials(credentials: StaticCredentials) -> Self {
        let sessions = InMemorySessionStore::arc();
        let policies = InMemoryPolicyStore::arc();
        let activity = InMemoryActivityLog::arc();
        let service = Service::new(
            sessions.clone(),
            policies.clone(),
            activity.clone(),
            Arc::new(credentials),
            AuthConfig::default(),
        );
        Self {
            service,
            sessions,
            policies,
            activity,
        }
    }
}

pub const TEAM_A: TeamId = TeamId::new(1);
pub const TEAM_B: TeamId = TeamId::new(2);

pub fn admin() -> RequestContext {
    Subject::new(UserId::new(1)).with_global_role(Role::Admin).into()
}

pub fn team_member(user: u64, team_id: TeamId, role: Role) -> RequestContext {
    Subject::new(UserId::new(user)).with_team_role(team_id, role).into()
}

pub fn payload(name: &str) -> PolicyPayload {
    PolicyPayload {
        name: name.to_string(),
        query: "SELECT 1 FROM osquery_info;".to_string(),
        ..Default::default()
    }
}
