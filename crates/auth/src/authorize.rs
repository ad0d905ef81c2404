use serde::Serialize;
use thiserror::Error;

use warden_core::{TeamId, UserId};

use crate::{Action, Authorizable, ResourceDescriptor, Role, RoleScope, Subject, role_grants};

/// Denial produced by [`authorize`].
///
/// Carries the subject, resource and action for audit logging. The
/// `internal` detail is for logs only and is not part of `Display`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("forbidden: user {subject} may not {action} {resource}")]
pub struct ForbiddenError {
    pub subject: UserId,
    pub resource: ResourceDescriptor,
    pub action: Action,
    internal: String,
}

impl ForbiddenError {
    pub fn new(
        subject: UserId,
        resource: ResourceDescriptor,
        action: Action,
        internal: impl Into<String>,
    ) -> Self {
        Self {
            subject,
            resource,
            action,
            internal: internal.into(),
        }
    }

    /// Diagnostic detail for logs (never shown to the caller).
    pub fn internal(&self) -> &str {
        &self.internal
    }
}

/// The rule that granted access.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Ownership,
    GlobalRole { role: Role },
    TeamRole { team_id: TeamId, role: Role },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow { by: Rule },
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Evaluate the rules in precedence order; first match wins.
///
/// 1. ownership override
/// 2. global role
/// 3. team role on the resource's team
/// 4. default deny
pub fn decide<R: Authorizable + ?Sized>(subject: &Subject, resource: &R, action: Action) -> Decision {
    let ownership = resource.ownership();
    if let Some(owned) = ownership {
        if owned.owner_id() == subject.user_id {
            return Decision::Allow { by: Rule::Ownership };
        }
    }
    let ownable = ownership.is_some();

    if let Some(role) = subject.global_role {
        if role_grants(role, RoleScope::Global, action, ownable) {
            return Decision::Allow {
                by: Rule::GlobalRole { role },
            };
        }
    }

    if let Some(team_id) = resource.team_id() {
        if let Some(role) = subject.team_role(team_id) {
            if role_grants(role, RoleScope::Team, action, ownable) {
                return Decision::Allow {
                    by: Rule::TeamRole { team_id, role },
                };
            }
        }
    }

    Decision::Deny
}

/// Authorize `subject` to perform `action` on `resource`.
///
/// - No IO
/// - No panics
/// - Team memberships must already be materialized on the subject
pub fn authorize<R: Authorizable + ?Sized>(
    subject: &Subject,
    resource: &R,
    action: Action,
) -> Result<(), ForbiddenError> {
    match decide(subject, resource, action) {
        Decision::Allow { .. } => Ok(()),
        Decision::Deny => Err(ForbiddenError::new(
            subject.user_id,
            ResourceDescriptor::of(resource),
            action,
            denial_detail(subject, resource, action),
        )),
    }
}

fn denial_detail<R: Authorizable + ?Sized>(subject: &Subject, resource: &R, action: Action) -> String {
    if resource.ownership().is_some() {
        return format!("{action} on another user's {} requires global admin", resource.kind());
    }
    match (subject.global_role, resource.team_id().and_then(|t| subject.team_role(t))) {
        (None, None) => "subject holds no role applicable to this resource".to_string(),
        (global, team) => format!(
            "roles (global: {}, team: {}) do not grant {action}",
            global.map(|r| r.as_str()).unwrap_or("none"),
            team.map(|r| r.as_str()).unwrap_or("none"),
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: Action,
    pub resource: ResourceDescriptor,
    pub decision: Decision,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub subject: SubjectState,
    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

/// Role assignments of the subject that was checked.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectState {
    pub user_id: UserId,
    pub global_role: Option<Role>,
    pub team_role: Option<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Another user's private resource.
    NotOwner,
    /// A role applies but does not carry the action.
    InsufficientRole,
    /// No role applies to the resource's scope.
    NoApplicableRole,
}

/// Explain why an authorization decision was made (or would be made).
///
/// Always agrees with [`authorize`]; it only adds the reasoning.
pub fn explain_authorization<R: Authorizable + ?Sized>(
    subject: &Subject,
    resource: &R,
    action: Action,
) -> AuthorizationExplanation {
    let decision = decide(subject, resource, action);
    let descriptor = ResourceDescriptor::of(resource);
    let team_role = resource.team_id().and_then(|t| subject.team_role(t));
    let state = SubjectState {
        user_id: subject.user_id,
        global_role: subject.global_role,
        team_role,
    };

    let (reason, denial_reason) = match decision {
        Decision::Allow { by: Rule::Ownership } => {
            (format!("user {} owns {descriptor}", subject.user_id), None)
        }
        Decision::Allow {
            by: Rule::GlobalRole { role },
        } => (format!("global {role} role grants {action}"), None),
        Decision::Allow {
            by: Rule::TeamRole { team_id, role },
        } => (format!("{role} role on team {team_id} grants {action}"), None),
        Decision::Deny => {
            let denial = denial_for(&descriptor, &state, action);
            (denial.message.clone(), Some(denial))
        }
    };

    AuthorizationExplanation {
        action,
        resource: descriptor,
        decision,
        reason,
        subject: state,
        denial_reason,
    }
}

fn denial_for(resource: &ResourceDescriptor, state: &SubjectState, action: Action) -> DenialReason {
    if resource.owner_id.is_some() {
        return DenialReason {
            kind: DenialKind::NotOwner,
            message: format!("{resource} belongs to another user"),
            suggestions: vec![
                "Act on the resource as its owner".to_string(),
                "Ask a global admin to perform the action".to_string(),
            ],
        };
    }

    if state.global_role.is_some() || state.team_role.is_some() {
        return DenialReason {
            kind: DenialKind::InsufficientRole,
            message: format!("assigned roles do not grant {action} on {resource}"),
            suggestions: vec![format!("Assign a maintainer or admin role covering {resource}")],
        };
    }

    let mut suggestions = vec!["Assign a global role".to_string()];
    if let Some(team_id) = resource.team_id {
        suggestions.insert(0, format!("Add the user to team {team_id}"));
    }
    DenialReason {
        kind: DenialKind::NoApplicableRole,
        message: format!("no role applies to {resource}"),
        suggestions,
    }
}
