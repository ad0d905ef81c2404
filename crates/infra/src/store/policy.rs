use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use warden_auth::ResourceKind;
use warden_core::{PolicyId, TeamId, UserId};
use warden_policies::{Policy, PolicyPayload};

use crate::StoreError;

/// Policy persistence, supplied by the caller.
///
/// `team_id == None` addresses global policies throughout.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Persist a new policy. Names are unique within a scope.
    async fn create_policy(
        &self,
        team_id: Option<TeamId>,
        author_id: Option<UserId>,
        payload: &PolicyPayload,
        now: DateTime<Utc>,
    ) -> Result<Policy, StoreError>;

    async fn policy(&self, id: PolicyId) -> Result<Option<Policy>, StoreError>;

    /// Load the policies that exist among `ids`; unknown ids are omitted.
    async fn policies_by_ids(&self, ids: &[PolicyId]) -> Result<BTreeMap<PolicyId, Policy>, StoreError>;

    async fn list_policies(&self, team_id: Option<TeamId>) -> Result<Vec<Policy>, StoreError>;

    /// Overwrite a stored policy (last write wins).
    async fn save_policy(&self, policy: &Policy) -> Result<(), StoreError>;

    /// Delete the policies among `ids` that belong to `team_id`, returning
    /// the ids actually deleted.
    async fn delete_policies(
        &self,
        team_id: Option<TeamId>,
        ids: &[PolicyId],
    ) -> Result<Vec<PolicyId>, StoreError>;
}

#[async_trait]
impl<S> PolicyStore for Arc<S>
where
    S: PolicyStore + ?Sized,
{
    async fn create_policy(
        &self,
        team_id: Option<TeamId>,
        author_id: Option<UserId>,
        payload: &PolicyPayload,
        now: DateTime<Utc>,
    ) -> Result<Policy, StoreError> {
        (**self).create_policy(team_id, author_id, payload, now).await
    }

    async fn policy(&self, id: PolicyId) -> Result<Option<Policy>, StoreError> {
        (**self).policy(id).await
    }

    async fn policies_by_ids(&self, ids: &[PolicyId]) -> Result<BTreeMap<PolicyId, Policy>, StoreError> {
        (**self).policies_by_ids(ids).await
    }

    async fn list_policies(&self, team_id: Option<TeamId>) -> Result<Vec<Policy>, StoreError> {
        (**self).list_policies(team_id).await
    }

    async fn save_policy(&self, policy: &Policy) -> Result<(), StoreError> {
        (**self).save_policy(policy).await
    }

    async fn delete_policies(
        &self,
        team_id: Option<TeamId>,
        ids: &[PolicyId],
    ) -> Result<Vec<PolicyId>, StoreError> {
        (**self).delete_policies(team_id, ids).await
    }
}

#[derive(Debug, Default)]
struct Policies {
    next_id: u64,
    by_id: HashMap<PolicyId, Policy>,
}

/// In-memory policy store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    inner: RwLock<Policies>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }
}

fn name_taken(policies: &Policies, team_id: Option<TeamId>, name: &str, except: Option<PolicyId>) -> bool {
    policies
        .by_id
        .values()
        .any(|p| p.team_id == team_id && p.name == name && Some(p.id) != except)
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn create_policy(
        &self,
        team_id: Option<TeamId>,
        author_id: Option<UserId>,
        payload: &PolicyPayload,
        now: DateTime<Utc>,
    ) -> Result<Policy, StoreError> {
        let mut inner = self.inner.write().await;
        if name_taken(&inner, team_id, &payload.name, None) {
            return Err(StoreError::Conflict(format!(
                "policy named '{}' already exists",
                payload.name
            )));
        }
        inner.next_id += 1;
        let policy = Policy {
            id: PolicyId::new(inner.next_id),
            team_id,
            name: payload.name.clone(),
            query: payload.query.clone(),
            description: payload.description.clone(),
            resolution: payload.resolution.clone(),
            platform: payload.platform.clone(),
            author_id,
            created_at: now,
            updated_at: now,
        };
        inner.by_id.insert(policy.id, policy.clone());
        Ok(policy)
    }

    async fn policy(&self, id: PolicyId) -> Result<Option<Policy>, StoreError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn policies_by_ids(&self, ids: &[PolicyId]) -> Result<BTreeMap<PolicyId, Policy>, StoreError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.by_id.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn list_policies(&self, team_id: Option<TeamId>) -> Result<Vec<Policy>, StoreError> {
        let inner = self.inner.read().await;
        let mut policies: Vec<_> = inner
            .by_id
            .values()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        policies.sort_by_key(|p| p.id);
        Ok(policies)
    }

    async fn save_policy(&self, policy: &Policy) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.by_id.contains_key(&policy.id) {
            return Err(StoreError::NotFound {
                kind: ResourceKind::Policy,
                id: policy.id.get(),
            });
        }
        if name_taken(&inner, policy.team_id, &policy.name, Some(policy.id)) {
            return Err(StoreError::Conflict(format!(
                "policy named '{}' already exists",
                policy.name
            )));
        }
        inner.by_id.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn delete_policies(
        &self,
        team_id: Option<TeamId>,
        ids: &[PolicyId],
    ) -> Result<Vec<PolicyId>, StoreError> {
        let mut inner = self.inner.write().await;
        let mut deleted = Vec::new();
        for id in ids {
            if inner.by_id.get(id).is_some_and(|p| p.team_id == team_id) {
                inner.by_id.remove(id);
                deleted.push(*id);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str) -> PolicyPayload {
        PolicyPayload {
            name: name.to_string(),
            query: "SELECT 1;".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn names_are_unique_per_scope() {
        let store = InMemoryPolicyStore::new();
        let now = Utc::now();
        let team = Some(TeamId::new(1));
        store.create_policy(team, None, &payload("a"), now).await.unwrap();
        store.create_policy(None, None, &payload("a"), now).await.unwrap();
        let err = store.create_policy(team, None, &payload("a"), now).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_only_touches_matching_scope() {
        let store = InMemoryPolicyStore::new();
        let now = Utc::now();
        let t1 = Some(TeamId::new(1));
        let a = store.create_policy(t1, None, &payload("a"), now).await.unwrap();
        let b = store.create_policy(Some(TeamId::new(2)), None, &payload("b"), now).await.unwrap();

        let deleted = store
            .delete_policies(t1, &[a.id, b.id, PolicyId::new(77)])
            .await
            .unwrap();
        assert_eq!(deleted, vec![a.id]);
        assert!(store.policy(b.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn by_ids_omits_unknown() {
        let store = InMemoryPolicyStore::new();
        let a = store.create_policy(None, None, &payload("a"), Utc::now()).await.unwrap();
        let found = store.policies_by_ids(&[a.id, PolicyId::new(99)]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&a.id));
    }
}
