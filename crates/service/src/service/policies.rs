use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, instrument};

use warden_activity::{ActivityDetails, ActivityType};
use warden_auth::{Action, ResourceDescriptor, ResourceKind};
use warden_core::{PolicyId, TeamId};
use warden_infra::{MutationGate, ServiceError, ServiceResult, StoreError, check_access};
use warden_policies::{ModifyPolicyPayload, Policy, PolicyPayload};

use super::Service;
use crate::RequestContext;

/// Team policies plus the global policies every team inherits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamPolicies {
    pub team: Vec<Policy>,
    pub inherited: Vec<Policy>,
}

impl Service {
    #[instrument(skip_all, fields(actor = %ctx.user_id(), team = %team_id))]
    pub async fn new_team_policy(
        &self,
        ctx: &RequestContext,
        team_id: TeamId,
        payload: PolicyPayload,
    ) -> ServiceResult<Policy> {
        self.new_policy("create team policy", ctx, Some(team_id), payload).await
    }

    #[instrument(skip_all, fields(actor = %ctx.user_id()))]
    pub async fn new_global_policy(&self, ctx: &RequestContext, payload: PolicyPayload) -> ServiceResult<Policy> {
        self.new_policy("create global policy", ctx, None, payload).await
    }

    async fn new_policy(
        &self,
        operation: &'static str,
        ctx: &RequestContext,
        team_id: Option<TeamId>,
        payload: PolicyPayload,
    ) -> ServiceResult<Policy> {
        let viewer = ctx.viewer();
        MutationGate::new(operation, viewer, ResourceDescriptor::policy_scope(team_id))
            .authorize_create()?
            .validate(|_| payload.verify())?
            .persist(|()| {
                self.policies
                    .create_policy(team_id, Some(viewer.user_id), &payload, Utc::now())
            })
            .await?
            .audit(self.activity.as_ref(), ActivityType::CreatedPolicy, |policy| {
                vec![policy_details(policy.id, &policy.name, policy.team_id)]
            })
            .await
    }

    pub async fn list_team_policies(&self, ctx: &RequestContext, team_id: TeamId) -> ServiceResult<TeamPolicies> {
        check_access(
            "list team policies",
            ctx.viewer(),
            &ResourceDescriptor::policy_scope(Some(team_id)),
            Action::Read,
        )?;
        let team = self.list_scope(Some(team_id)).await?;
        let inherited = self.list_scope(None).await?;
        Ok(TeamPolicies { team, inherited })
    }

    pub async fn list_global_policies(&self, ctx: &RequestContext) -> ServiceResult<Vec<Policy>> {
        check_access(
            "list global policies",
            ctx.viewer(),
            &ResourceDescriptor::policy_scope(None),
            Action::Read,
        )?;
        self.list_scope(None).await
    }

    pub async fn team_policy_by_id(
        &self,
        ctx: &RequestContext,
        team_id: TeamId,
        id: PolicyId,
    ) -> ServiceResult<Policy> {
        self.policy_in_scope("get team policy", ctx, Some(team_id), id).await
    }

    pub async fn global_policy_by_id(&self, ctx: &RequestContext, id: PolicyId) -> ServiceResult<Policy> {
        self.policy_in_scope("get global policy", ctx, None, id).await
    }

    #[instrument(skip_all, fields(actor = %ctx.user_id(), team = %team_id, policy = %id))]
    pub async fn modify_team_policy(
        &self,
        ctx: &RequestContext,
        team_id: TeamId,
        id: PolicyId,
        payload: ModifyPolicyPayload,
    ) -> ServiceResult<Policy> {
        self.modify_policy("modify team policy", ctx, Some(team_id), id, payload)
            .await
    }

    #[instrument(skip_all, fields(actor = %ctx.user_id(), policy = %id))]
    pub async fn modify_global_policy(
        &self,
        ctx: &RequestContext,
        id: PolicyId,
        payload: ModifyPolicyPayload,
    ) -> ServiceResult<Policy> {
        self.modify_policy("modify global policy", ctx, None, id, payload)
            .await
    }

    async fn modify_policy(
        &self,
        operation: &'static str,
        ctx: &RequestContext,
        team_id: Option<TeamId>,
        id: PolicyId,
        payload: ModifyPolicyPayload,
    ) -> ServiceResult<Policy> {
        let payload = &payload;
        MutationGate::new(operation, ctx.viewer(), ResourceDescriptor::policy_scope(team_id))
            .authorize_declared()?
            .load(ResourceKind::Policy, id.get(), self.policies.policy(id))
            .await?
            .authorize_actual()?
            .validate(|_| payload.verify())?
            .persist(|mut policy| async move {
                payload.apply_to(&mut policy, Utc::now());
                self.policies.save_policy(&policy).await?;
                Ok::<_, StoreError>(policy)
            })
            .await?
            .audit(self.activity.as_ref(), ActivityType::EditedPolicy, |policy| {
                vec![policy_details(policy.id, &policy.name, policy.team_id)]
            })
            .await
    }

    /// Delete `ids` from the team. Returns the ids actually deleted.
    #[instrument(skip_all, fields(actor = %ctx.user_id(), team = %team_id, count = ids.len()))]
    pub async fn delete_team_policies(
        &self,
        ctx: &RequestContext,
        team_id: TeamId,
        ids: &[PolicyId],
    ) -> ServiceResult<Vec<PolicyId>> {
        self.delete_policies("delete team policies", ctx, Some(team_id), ids)
            .await
    }

    #[instrument(skip_all, fields(actor = %ctx.user_id(), count = ids.len()))]
    pub async fn delete_global_policies(
        &self,
        ctx: &RequestContext,
        ids: &[PolicyId],
    ) -> ServiceResult<Vec<PolicyId>> {
        self.delete_policies("delete global policies", ctx, None, ids)
            .await
    }

    /// A batch holding any policy outside the declared scope is rejected
    /// whole; nothing is deleted.
    async fn delete_policies(
        &self,
        operation: &'static str,
        ctx: &RequestContext,
        team_id: Option<TeamId>,
        ids: &[PolicyId],
    ) -> ServiceResult<Vec<PolicyId>> {
        let cleared = MutationGate::new(operation, ctx.viewer(), ResourceDescriptor::policy_scope(team_id))
            .authorize_declared()?;
        if ids.is_empty() {
            debug!(operation, "empty batch");
            return Ok(Vec::new());
        }

        let deleted = cleared
            .load_batch(ResourceKind::Policy, async {
                let found = self.policies.policies_by_ids(ids).await?;
                Ok::<Vec<Policy>, StoreError>(found.into_values().collect())
            })
            .await?
            .authorize_batch()?
            .no_payload()
            .persist(|policies| async move {
                let mut names: BTreeMap<PolicyId, String> =
                    policies.into_iter().map(|p| (p.id, p.name)).collect();
                let deleted = self.policies.delete_policies(team_id, ids).await?;
                Ok::<_, StoreError>(
                    deleted
                        .into_iter()
                        .map(|id| {
                            let name = names.remove(&id).unwrap_or_default();
                            (id, name)
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .await?
            .audit(self.activity.as_ref(), ActivityType::DeletedPolicy, |deleted| {
                deleted
                    .iter()
                    .map(|(id, name)| policy_details(*id, name, team_id))
                    .collect()
            })
            .await?;

        Ok(deleted.into_iter().map(|(id, _)| id).collect())
    }

    async fn list_scope(&self, team_id: Option<TeamId>) -> ServiceResult<Vec<Policy>> {
        self.policies
            .list_policies(team_id)
            .await
            .map_err(|e| ServiceError::store(format!("listing {}", ResourceDescriptor::policy_scope(team_id)), e))
    }

    /// A policy that exists in another scope reads as absent.
    async fn policy_in_scope(
        &self,
        operation: &'static str,
        ctx: &RequestContext,
        team_id: Option<TeamId>,
        id: PolicyId,
    ) -> ServiceResult<Policy> {
        check_access(
            operation,
            ctx.viewer(),
            &ResourceDescriptor::policy_scope(team_id),
            Action::Read,
        )?;
        let not_found = || ServiceError::NotFound {
            kind: ResourceKind::Policy,
            id: id.get(),
        };
        let policy = self
            .policies
            .policy(id)
            .await
            .map_err(|e| ServiceError::store(format!("{operation} {id}"), e))?
            .ok_or_else(not_found)?;
        if policy.team_id != team_id {
            return Err(not_found());
        }
        Ok(policy)
    }
}

fn policy_details(id: PolicyId, name: &str, team_id: Option<TeamId>) -> ActivityDetails {
    let mut details = ActivityDetails::new();
    details.insert("policy_id".to_string(), id.get().into());
    details.insert("policy_name".to_string(), name.into());
    if let Some(team_id) = team_id {
        details.insert("team_id".to_string(), team_id.get().into());
    }
    details
}
