//! Audit sink contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use warden_activity::{Activity, ActivityType};

use crate::AuditError;

/// Records facts about committed mutations.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record_activity(&self, activity: Activity) -> Result<(), AuditError>;
}

#[async_trait]
impl<S> ActivitySink for Arc<S>
where
    S: ActivitySink + ?Sized,
{
    async fn record_activity(&self, activity: Activity) -> Result<(), AuditError> {
        (**self).record_activity(activity).await
    }
}

/// Append-only in-memory activity log for tests/dev.
///
/// Can be switched to an unavailable state to exercise audit failures.
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: RwLock<Vec<Activity>>,
    unavailable: AtomicBool,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn entries(&self) -> Vec<Activity> {
        self.entries.read().await.clone()
    }

    pub async fn of_type(&self, activity_type: ActivityType) -> Vec<Activity> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|a| a.activity_type == activity_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ActivitySink for InMemoryActivityLog {
    async fn record_activity(&self, activity: Activity) -> Result<(), AuditError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuditError::Unavailable("activity log offline".to_string()));
        }
        self.entries.write().await.push(activity);
        Ok(())
    }
}
