//! The operations request handlers call.
//!
//! Every gated operation takes the [`crate::RequestContext`] of the authenticated
//! viewer. Adapters are injected once; the service itself keeps no state.

mod policies;
pub use policies::TeamPolicies;
mod sessions;

use std::sync::Arc;

use tracing::info;

use warden_infra::workers::{ReaperHandle, SessionReaper};
use warden_infra::{ActivitySink, AuthConfig, PolicyStore, ReaperConfig, SessionAuthority, SessionStore};

use crate::CredentialVerifier;

pub type SharedSessionStore = Arc<dyn SessionStore>;

#[derive(Clone)]
pub struct Service {
    sessions: Arc<SessionAuthority<SharedSessionStore>>,
    policies: Arc<dyn PolicyStore>,
    activity: Arc<dyn ActivitySink>,
    credentials: Arc<dyn CredentialVerifier>,
}

impl Service {
    pub fn new(
        sessions: SharedSessionStore,
        policies: Arc<dyn PolicyStore>,
        activity: Arc<dyn ActivitySink>,
        credentials: Arc<dyn CredentialVerifier>,
        config: AuthConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionAuthority::new(sessions, config)),
            policies,
            activity,
            credentials,
        }
    }

    pub fn session_authority(&self) -> Arc<SessionAuthority<SharedSessionStore>> {
        Arc::clone(&self.sessions)
    }

    /// Start the background sweep when enabled. Must run inside a tokio
    /// runtime.
    pub fn spawn_reaper(&self, config: ReaperConfig) -> Option<ReaperHandle> {
        if !config.enabled {
            info!("session reaper disabled");
            return None;
        }
        Some(SessionReaper::spawn(self.session_authority(), config))
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("session_duration", &self.sessions.session_duration())
            .finish_non_exhaustive()
    }
}
