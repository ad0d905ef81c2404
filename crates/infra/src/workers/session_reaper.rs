use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{ReaperConfig, SessionAuthority, SessionStore};

/// Handle to stop and join a running reaper.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl ReaperHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(err) = self.join.await {
            warn!(error = %err, "session reaper task ended abnormally");
        }
    }
}

/// Periodically removes sessions that would already fail validation.
///
/// Storage hygiene only: correctness comes from the lazy check in
/// [`SessionAuthority::validate_by_key`].
#[derive(Debug)]
pub struct SessionReaper;

impl SessionReaper {
    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn<S>(authority: Arc<SessionAuthority<S>>, config: ReaperConfig) -> ReaperHandle
    where
        S: SessionStore + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let join = tokio::spawn(async move {
            info!(interval_secs = config.interval.as_secs(), "session reaper started");
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = signal.notified() => break,
                    _ = ticker.tick() => {
                        match authority.reap_expired(Utc::now()).await {
                            Ok(0) => debug!("no expired sessions"),
                            Ok(removed) => info!(removed, "expired sessions reaped"),
                            Err(err) => warn!(error = %err, "session sweep failed"),
                        }
                    }
                }
            }
            info!("session reaper stopped");
        });

        ReaperHandle { shutdown, join }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use chrono::Duration;
    use warden_auth::Session;
    use warden_core::{SessionId, UserId};

    use crate::{AuthConfig, InMemorySessionStore};

    #[tokio::test]
    async fn sweeps_until_shut_down() {
        let store = InMemorySessionStore::arc();
        let stale = Utc::now() - Duration::hours(30);
        for (id, api_only) in [(1, false), (2, true)] {
            store
                .insert(Session {
                    id: SessionId::new(id),
                    user_id: UserId::new(7),
                    key: format!("key-{id}"),
                    created_at: stale,
                    accessed_at: stale,
                    api_only,
                })
                .await
                .unwrap();
        }

        let authority = Arc::new(SessionAuthority::new(store.clone(), AuthConfig::default()));
        let handle = SessionReaper::spawn(
            authority,
            ReaperConfig {
                enabled: true,
                interval: StdDuration::from_millis(10),
            },
        );

        tokio::time::sleep(StdDuration::from_millis(60)).await;
        handle.shutdown().await;

        assert_eq!(store.len().await, 1);
        assert!(store.session_by_id(SessionId::new(2)).await.unwrap().is_some());
    }
}
