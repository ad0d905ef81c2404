use core::str::FromStr;

use serde::{Deserialize, Serialize};
use warden_core::DomainError;

use crate::Action;

/// Role identifier used for RBAC.
///
/// The same three roles exist at global scope and per team; what a role
/// grants depends on the scope it was assigned at (see [`role_grants`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Maintainer,
    Observer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Maintainer, Role::Observer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Maintainer => "maintainer",
            Role::Observer => "observer",
        }
    }

    /// Actions the role carries on resources it applies to.
    pub fn allows(&self, action: Action) -> bool {
        match (self, action) {
            (Role::Observer, Action::Write) => false,
            _ => true,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "maintainer" => Ok(Role::Maintainer),
            "observer" => Ok(Role::Observer),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// Where a role assignment applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    Global,
    Team,
}

/// Total role table: does `role`, assigned at `scope`, grant `action` on a
/// resource it applies to?
///
/// - A global admin is granted everything, owned resources included.
/// - Ownable resources (sessions) are private: no other role reaches them.
/// - Otherwise observers read and maintainers/admins read and write.
pub fn role_grants(role: Role, scope: RoleScope, action: Action, ownable: bool) -> bool {
    match (scope, role) {
        (RoleScope::Global, Role::Admin) => true,
        _ if ownable => false,
        (_, role) => role.allows(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_never_writes() {
        for scope in [RoleScope::Global, RoleScope::Team] {
            for ownable in [true, false] {
                assert!(!role_grants(Role::Observer, scope, Action::Write, ownable));
            }
        }
    }

    #[test]
    fn only_global_admin_reaches_owned_resources() {
        for role in Role::ALL {
            for scope in [RoleScope::Global, RoleScope::Team] {
                for action in Action::ALL {
                    let expected = scope == RoleScope::Global && role == Role::Admin;
                    assert_eq!(role_grants(role, scope, action, true), expected, "{role} {scope:?} {action}");
                }
            }
        }
    }

    #[test]
    fn team_roles_on_team_resources() {
        assert!(role_grants(Role::Maintainer, RoleScope::Team, Action::Write, false));
        assert!(role_grants(Role::Admin, RoleScope::Team, Action::Write, false));
        assert!(role_grants(Role::Observer, RoleScope::Team, Action::Read, false));
    }

    #[test]
    fn parses_role_names() {
        assert_eq!("Maintainer".parse::<Role>().unwrap(), Role::Maintainer);
        assert!("owner".parse::<Role>().is_err());
    }
}
