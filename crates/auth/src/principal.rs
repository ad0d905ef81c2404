use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use warden_core::{TeamId, UserId};

use crate::Role;

/// The authenticated actor making a request (the "viewer").
///
/// Team memberships are materialized up front so authorization never needs
/// to look anything up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub user_id: UserId,
    pub global_role: Option<Role>,
    #[serde(default)]
    pub team_roles: BTreeMap<TeamId, Role>,
}

impl Subject {
    /// A subject with no role assignments (ownership-based access only).
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            global_role: None,
            team_roles: BTreeMap::new(),
        }
    }

    pub fn with_global_role(mut self, role: Role) -> Self {
        self.global_role = Some(role);
        self
    }

    pub fn with_team_role(mut self, team_id: TeamId, role: Role) -> Self {
        self.team_roles.insert(team_id, role);
        self
    }

    pub fn team_role(&self, team_id: TeamId) -> Option<Role> {
        self.team_roles.get(&team_id).copied()
    }

    pub fn is_global_admin(&self) -> bool {
        self.global_role == Some(Role::Admin)
    }
}
