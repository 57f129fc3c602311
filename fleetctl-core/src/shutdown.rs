//! Shutdown Intake (C10, spec.md §4.9).

use crate::error::{CoreError, CoreResult};
use crate::online_cache::OnlineNodeCache;
use fleetctl_cluster::ClusterAdapter;
use std::sync::Arc;

pub struct ShutdownIntake {
    online_cache: Arc<OnlineNodeCache>,
    cluster: Arc<dyn ClusterAdapter>,
}

impl ShutdownIntake {
    pub fn new(online_cache: Arc<OnlineNodeCache>, cluster: Arc<dyn ClusterAdapter>) -> Self {
        Self {
            online_cache,
            cluster,
        }
    }

    /// Submits a graceful `clean_up` for `name` if it is a known cluster
    /// member; otherwise `NotRegistered` (mapped to HTTP 404 at the
    /// surface). The drain runs detached — the caller gets an immediate
    /// acknowledgement, matching `gracefully_kill_node`'s fire-and-forget
    /// thread-pool submission.
    #[tracing::instrument(skip(self))]
    pub async fn graceful_shutdown(&self, name: &str) -> CoreResult<()> {
        let online = self.online_cache.get().await?;
        if !online.contains(name) {
            return Err(CoreError::NotRegistered);
        }

        let cluster = self.cluster.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            if let Err(e) = cluster.clean_up(&name, true).await {
                tracing::warn!(node = %name, error = %e, "graceful shutdown clean_up failed");
            }
        });
        Ok(())
    }
}
