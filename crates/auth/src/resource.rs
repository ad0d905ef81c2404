//! Resource capabilities seen by the authorization engine.

use serde::{Deserialize, Serialize};

use warden_core::{TeamId, UserId};

/// Kind of resource being authorized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Session,
    Policy,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Session => "session",
            ResourceKind::Policy => "policy",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership capability, implemented by resource types that have an owner.
pub trait HasOwner {
    fn owner_id(&self) -> UserId;
}

impl HasOwner for UserId {
    fn owner_id(&self) -> UserId {
        *self
    }
}

/// Anything the engine can make a decision about.
///
/// Implemented by concrete resources (after load) and by
/// [`ResourceDescriptor`] (for caller-declared scopes before load).
pub trait Authorizable {
    fn kind(&self) -> ResourceKind;

    fn resource_id(&self) -> Option<u64> {
        None
    }

    /// `None` for global (unscoped) resources.
    fn team_id(&self) -> Option<TeamId> {
        None
    }

    /// `Some` only for resource kinds that support ownership.
    fn ownership(&self) -> Option<&dyn HasOwner> {
        None
    }
}

/// Scope and identity snapshot of a resource.
///
/// Used both to authorize hypothetical resources (the declared scope of a
/// request) and to report which resource a denial was about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub id: Option<u64>,
    pub team_id: Option<TeamId>,
    pub owner_id: Option<UserId>,
}

impl ResourceDescriptor {
    /// Snapshot any authorizable resource.
    pub fn of<R: Authorizable + ?Sized>(resource: &R) -> Self {
        Self {
            kind: resource.kind(),
            id: resource.resource_id(),
            team_id: resource.team_id(),
            owner_id: resource.ownership().map(|o| o.owner_id()),
        }
    }

    /// Any policy within the given scope (`None` = global policies).
    pub fn policy_scope(team_id: Option<TeamId>) -> Self {
        Self {
            kind: ResourceKind::Policy,
            id: None,
            team_id,
            owner_id: None,
        }
    }

    /// Any session belonging to `owner`.
    pub fn sessions_of(owner: UserId) -> Self {
        Self {
            kind: ResourceKind::Session,
            id: None,
            team_id: None,
            owner_id: Some(owner),
        }
    }
}

impl Authorizable for ResourceDescriptor {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn resource_id(&self) -> Option<u64> {
        self.id
    }

    fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }

    fn ownership(&self) -> Option<&dyn HasOwner> {
        self.owner_id.as_ref().map(|o| o as &dyn HasOwner)
    }
}

impl core::fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(id) = self.id {
            write!(f, " {id}")?;
        }
        match self.team_id {
            Some(team_id) => write!(f, " (team {team_id})")?,
            None if self.kind == ResourceKind::Policy => f.write_str(" (global)")?,
            None => {}
        }
        if let Some(owner) = self.owner_id {
            write!(f, " owned by user {owner}")?;
        }
        Ok(())
    }
}
