//! Gated mutation pipeline (application-level orchestration).
//!
//! Every write on a scoped resource runs the same sequence:
//!
//! ```text
//! declared-scope authorize (Read)   fail fast, before any storage read
//!   ↓
//! load by id                        NotFound only after step 1 passed
//!   ↓
//! actual-scope authorize (Write)    uses the loaded resource's own scope
//!   ↓
//! validate payload                  BadRequest, nothing touched yet
//!   ↓
//! persist
//!   ↓
//! audit (one activity per resource)
//! ```
//!
//! Each step consumes the previous stage and returns the next, so steps
//! cannot be skipped or reordered. Every store/sink call is an await point:
//! dropping the future before `persist` leaves storage untouched. Persist and
//! audit are not atomic; an audit failure after a successful persist surfaces
//! as [`ServiceError::AuditAfterCommit`].

use std::future::Future;

use tracing::{debug, error, warn};

use warden_activity::{Activity, ActivityDetails, ActivityType};
use warden_auth::{
    Action, Authorizable, ForbiddenError, ResourceDescriptor, ResourceKind, Subject, authorize,
};
use warden_core::{DomainResult, UserId};

use crate::{ActivitySink, ServiceError, ServiceResult, StoreError};

/// Entry point of the pipeline for one operation.
#[derive(Debug)]
pub struct MutationGate<'a> {
    operation: &'static str,
    subject: &'a Subject,
    declared: ResourceDescriptor,
}

impl<'a> MutationGate<'a> {
    /// `declared` is the scope the caller asked for (e.g. the team in the path).
    pub fn new(operation: &'static str, subject: &'a Subject, declared: ResourceDescriptor) -> Self {
        Self {
            operation,
            subject,
            declared,
        }
    }

    /// Step 1 for mutations of existing resources: Read on the declared scope.
    pub fn authorize_declared(self) -> ServiceResult<ScopeCleared<'a>> {
        self.check(&self.declared, Action::Read)?;
        debug!(operation = self.operation, scope = %self.declared, "declared scope cleared");
        Ok(ScopeCleared { gate: self })
    }

    /// Creation has nothing to load: Write on the declared scope is both
    /// authorization steps at once.
    pub fn authorize_create(self) -> ServiceResult<Authorized<'a, ()>> {
        self.check(&self.declared, Action::Write)?;
        Ok(Authorized {
            gate: self,
            resource: (),
        })
    }

    fn check<R: Authorizable + ?Sized>(&self, resource: &R, action: Action) -> ServiceResult<()> {
        check_access(self.operation, self.subject, resource, action)
    }

    fn denied(&self, denied: ForbiddenError) -> ServiceError {
        log_denial(self.operation, &denied);
        ServiceError::Forbidden(denied)
    }

    fn context(&self, step: impl core::fmt::Display) -> String {
        format!("{}: {step}", self.operation)
    }
}

/// Authorize a single access outside a mutation (read paths), logging denials
/// the same way the pipeline does.
pub fn check_access<R: Authorizable + ?Sized>(
    operation: &'static str,
    subject: &Subject,
    resource: &R,
    action: Action,
) -> ServiceResult<()> {
    authorize(subject, resource, action).map_err(|denied| {
        log_denial(operation, &denied);
        ServiceError::Forbidden(denied)
    })
}

fn log_denial(operation: &'static str, denied: &ForbiddenError) {
    warn!(
        operation,
        subject = %denied.subject,
        resource = %denied.resource,
        action = %denied.action,
        detail = denied.internal(),
        "authorization denied"
    );
}

/// The declared scope is visible to the subject; resources may be loaded.
#[derive(Debug)]
pub struct ScopeCleared<'a> {
    gate: MutationGate<'a>,
}

impl<'a> ScopeCleared<'a> {
    /// Step 2: load one resource. Absent resources are `NotFound`.
    pub async fn load<R, F>(self, kind: ResourceKind, id: u64, load: F) -> ServiceResult<Loaded<'a, R>>
    where
        R: Authorizable,
        F: Future<Output = Result<Option<R>, StoreError>>,
    {
        let resource = load
            .await
            .map_err(|e| ServiceError::store(self.gate.context(format_args!("loading {kind} {id}")), e))?
            .ok_or(ServiceError::NotFound { kind, id })?;
        Ok(Loaded {
            gate: self.gate,
            resource,
        })
    }

    /// Step 2 for batches: ids that resolve to nothing are simply absent.
    pub async fn load_batch<R, F>(self, kind: ResourceKind, load: F) -> ServiceResult<LoadedBatch<'a, R>>
    where
        R: Authorizable,
        F: Future<Output = Result<Vec<R>, StoreError>>,
    {
        let resources = load
            .await
            .map_err(|e| ServiceError::store(self.gate.context(format_args!("loading {kind} batch")), e))?;
        Ok(LoadedBatch {
            gate: self.gate,
            resources,
        })
    }
}

#[derive(Debug)]
pub struct Loaded<'a, R> {
    gate: MutationGate<'a>,
    resource: R,
}

impl<'a, R: Authorizable> Loaded<'a, R> {
    /// Step 3: Write against the resource's actual scope, not the declared one.
    pub fn authorize_actual(self) -> ServiceResult<Authorized<'a, R>> {
        self.gate.check(&self.resource, Action::Write)?;
        Ok(Authorized {
            gate: self.gate,
            resource: self.resource,
        })
    }
}

#[derive(Debug)]
pub struct LoadedBatch<'a, R> {
    gate: MutationGate<'a>,
    resources: Vec<R>,
}

impl<'a, R: Authorizable> LoadedBatch<'a, R> {
    /// Step 3 for batches: Write on the declared scope, and every loaded
    /// resource must live in that scope. One stray resource rejects the
    /// whole batch, naming it.
    pub fn authorize_batch(self) -> ServiceResult<Authorized<'a, Vec<R>>> {
        let gate = self.gate;
        gate.check(&gate.declared, Action::Write)?;

        let declared_team = gate.declared.team_id;
        if let Some(stray) = self.resources.iter().find(|r| r.team_id() != declared_team) {
            let scope = match declared_team {
                Some(team_id) => format!("team {team_id}"),
                None => "global scope".to_string(),
            };
            let resource = ResourceDescriptor::of(stray);
            let detail = format!("{resource} does not belong to {scope}");
            return Err(gate.denied(ForbiddenError::new(
                gate.subject.user_id,
                resource,
                Action::Write,
                detail,
            )));
        }

        Ok(Authorized {
            gate,
            resource: self.resources,
        })
    }
}

/// Both authorization steps passed.
#[derive(Debug)]
pub struct Authorized<'a, T> {
    gate: MutationGate<'a>,
    resource: T,
}

impl<'a, T> Authorized<'a, T> {
    /// Step 4: domain validation before anything is written.
    pub fn validate(self, check: impl FnOnce(&T) -> DomainResult<()>) -> ServiceResult<Validated<'a, T>> {
        check(&self.resource)?;
        Ok(Validated {
            gate: self.gate,
            resource: self.resource,
        })
    }

    /// For mutations that carry no payload (deletes).
    pub fn no_payload(self) -> Validated<'a, T> {
        Validated {
            gate: self.gate,
            resource: self.resource,
        }
    }
}

#[derive(Debug)]
pub struct Validated<'a, T> {
    gate: MutationGate<'a>,
    resource: T,
}

impl<'a, T> Validated<'a, T> {
    /// Step 5: apply the change through the store adapter.
    pub async fn persist<U, F, Fut>(self, persist: F) -> ServiceResult<Committed<'a, U>>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<U, StoreError>>,
    {
        let value = persist(self.resource)
            .await
            .map_err(|e| ServiceError::store(self.gate.context("persisting"), e))?;
        debug!(operation = self.gate.operation, "mutation persisted");
        Ok(Committed {
            gate: self.gate,
            value,
        })
    }
}

/// The change is in storage; only the audit trail remains.
#[derive(Debug)]
pub struct Committed<'a, U> {
    gate: MutationGate<'a>,
    value: U,
}

impl<'a, U> Committed<'a, U> {
    pub fn actor(&self) -> UserId {
        self.gate.subject.user_id
    }

    /// Step 6: one activity per mutated resource, attributed to the subject.
    pub async fn audit<S>(
        self,
        sink: &S,
        activity_type: ActivityType,
        details: impl FnOnce(&U) -> Vec<ActivityDetails>,
    ) -> ServiceResult<U>
    where
        S: ActivitySink + ?Sized,
    {
        let actor = self.actor();
        for entry in details(&self.value) {
            let mut activity = Activity::new(actor, activity_type, chrono::Utc::now());
            activity.details = entry;
            if let Err(source) = sink.record_activity(activity).await {
                error!(
                    operation = self.gate.operation,
                    activity = %activity_type,
                    error = %source,
                    "activity not recorded for committed mutation"
                );
                return Err(ServiceError::AuditAfterCommit {
                    context: self.gate.context(format_args!("recording {activity_type}")),
                    source,
                });
            }
        }
        Ok(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::json;
    use warden_auth::Role;
    use warden_core::{DomainError, TeamId};

    use crate::InMemoryActivityLog;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: u64,
        team: Option<TeamId>,
    }

    impl Authorizable for Doc {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Policy
        }
        fn resource_id(&self) -> Option<u64> {
            Some(self.id)
        }
        fn team_id(&self) -> Option<TeamId> {
            self.team
        }
    }

    fn team(id: u64) -> Option<TeamId> {
        Some(TeamId::new(id))
    }

    fn maintainer_of(team_id: u64) -> Subject {
        Subject::new(UserId::new(1)).with_team_role(TeamId::new(team_id), Role::Maintainer)
    }

    fn details(doc: &Doc) -> ActivityDetails {
        json!({ "doc_id": doc.id }).as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn declared_scope_denial_happens_before_load() {
        let subject = maintainer_of(2);
        let loaded = AtomicBool::new(false);
        let gate = MutationGate::new("modify doc", &subject, ResourceDescriptor::policy_scope(team(1)));

        let err = match gate.authorize_declared() {
            Ok(cleared) => cleared
                .load(ResourceKind::Policy, 7, async {
                    loaded.store(true, Ordering::SeqCst);
                    Ok::<_, StoreError>(None::<Doc>)
                })
                .await
                .err(),
            Err(e) => Some(e),
        };
        assert!(matches!(err, Some(ServiceError::Forbidden(_))));
        assert!(!loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found_after_scope_check() {
        let subject = maintainer_of(1);
        let gate = MutationGate::new("modify doc", &subject, ResourceDescriptor::policy_scope(team(1)));
        let err = gate
            .authorize_declared()
            .unwrap()
            .load(ResourceKind::Policy, 7, async { Ok::<_, StoreError>(None::<Doc>) })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { id: 7, .. }));
    }

    #[tokio::test]
    async fn actual_scope_catches_scope_confusion() {
        // Authorized for team 1, but the loaded doc belongs to team 2.
        let subject = maintainer_of(1);
        let gate = MutationGate::new("modify doc", &subject, ResourceDescriptor::policy_scope(team(1)));
        let loaded = gate
            .authorize_declared()
            .unwrap()
            .load(ResourceKind::Policy, 7, async {
                Ok::<_, StoreError>(Some(Doc { id: 7, team: team(2) }))
            })
            .await
            .unwrap();
        let err = loaded.authorize_actual().unwrap_err();
        let ServiceError::Forbidden(denied) = err else {
            panic!("expected forbidden");
        };
        assert_eq!(denied.resource.team_id, team(2));
        assert_eq!(denied.resource.id, Some(7));
    }

    #[tokio::test]
    async fn batch_with_stray_resource_is_rejected_whole() {
        let subject = maintainer_of(1);
        let gate = MutationGate::new("delete docs", &subject, ResourceDescriptor::policy_scope(team(1)));
        let docs = vec![
            Doc { id: 1, team: team(1) },
            Doc { id: 2, team: team(1) },
            Doc { id: 3, team: team(9) },
        ];
        let err = gate
            .authorize_declared()
            .unwrap()
            .load_batch(ResourceKind::Policy, async { Ok::<_, StoreError>(docs) })
            .await
            .unwrap()
            .authorize_batch()
            .unwrap_err();
        let ServiceError::Forbidden(denied) = err else {
            panic!("expected forbidden");
        };
        assert_eq!(denied.resource.id, Some(3));
        assert_eq!(denied.internal(), "policy 3 (team 9) does not belong to team 1");
    }

    #[tokio::test]
    async fn validation_failure_stops_before_persist() {
        let subject = maintainer_of(1);
        let gate = MutationGate::new("create doc", &subject, ResourceDescriptor::policy_scope(team(1)));
        let err = gate
            .authorize_create()
            .unwrap()
            .validate(|_| Err(DomainError::validation("name cannot be empty")))
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest { ref message } if message == "name cannot be empty"));
    }

    #[tokio::test]
    async fn full_pipeline_persists_then_audits() {
        let subject = maintainer_of(1);
        let log = InMemoryActivityLog::new();
        let gate = MutationGate::new("create doc", &subject, ResourceDescriptor::policy_scope(team(1)));

        let doc = gate
            .authorize_create()
            .unwrap()
            .validate(|_| Ok(()))
            .unwrap()
            .persist(|()| async { Ok::<_, StoreError>(Doc { id: 5, team: team(1) }) })
            .await
            .unwrap()
            .audit(&log, ActivityType::CreatedPolicy, |d| vec![details(d)])
            .await
            .unwrap();

        assert_eq!(doc.id, 5);
        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, UserId::new(1));
        assert_eq!(entries[0].detail("doc_id"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn audit_failure_after_commit_is_distinguishable() {
        let subject = maintainer_of(1);
        let log = InMemoryActivityLog::new();
        log.set_unavailable(true);
        let persisted = AtomicBool::new(false);
        let gate = MutationGate::new("create doc", &subject, ResourceDescriptor::policy_scope(team(1)));

        let err = gate
            .authorize_create()
            .unwrap()
            .no_payload()
            .persist(|()| async {
                persisted.store(true, Ordering::SeqCst);
                Ok::<_, StoreError>(Doc { id: 5, team: team(1) })
            })
            .await
            .unwrap()
            .audit(&log, ActivityType::CreatedPolicy, |d| vec![details(d)])
            .await
            .unwrap_err();

        assert!(persisted.load(Ordering::SeqCst));
        assert!(err.is_committed());
        assert!(err.to_string().starts_with("create doc: recording created_policy"));
    }

    #[tokio::test]
    async fn store_failure_carries_operation_context() {
        let subject = maintainer_of(1);
        let gate = MutationGate::new("modify doc", &subject, ResourceDescriptor::policy_scope(team(1)));
        let err = gate
            .authorize_declared()
            .unwrap()
            .load(ResourceKind::Policy, 4, async {
                Err::<Option<Doc>, _>(StoreError::Storage("connection reset".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "modify doc: loading policy 4: storage error: connection reset");
    }
}
