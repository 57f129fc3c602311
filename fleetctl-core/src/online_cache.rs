//! Online-Node Cache (C11, spec.md §4.10).

use crate::error::CoreResult;
use fleetctl_cluster::ClusterAdapter;
use fleetctl_kv::{LockService, SharedSetStore};
use fleetctl_types::ONLINE_CACHE_TTL;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const CONNECTED_NODES_LOCK: &str = "connected-nodes-lock";
const LOCK_TTL: Duration = Duration::from_millis(500);

pub struct OnlineNodeCache {
    shared_set: SharedSetStore,
    lock: LockService,
    cluster: Arc<dyn ClusterAdapter>,
}

impl OnlineNodeCache {
    pub fn new(shared_set: SharedSetStore, lock: LockService, cluster: Arc<dyn ClusterAdapter>) -> Self {
        Self {
            shared_set,
            lock,
            cluster,
        }
    }

    /// Returns the current cluster member set, refreshing it from C4 if
    /// the cached copy is older than [`ONLINE_CACHE_TTL`]. The refresh
    /// check-and-act is serialized across replicas by
    /// `connected-nodes-lock` so only one replica lists the cluster per
    /// staleness window.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self) -> CoreResult<HashSet<String>> {
        let guard = self.lock.lock(CONNECTED_NODES_LOCK, LOCK_TTL).await?;
        let guard = match guard {
            Some(g) => g,
            None => return Ok(self.shared_set.members().await?),
        };

        let now = chrono::Utc::now().timestamp();
        let stale = is_stale(self.shared_set.last_refresh().await?, now, ONLINE_CACHE_TTL.as_secs() as i64);

        let result = if stale {
            let names: HashSet<String> = self
                .cluster
                .list_nodes()
                .await?
                .into_iter()
                .map(|n| n.name)
                .collect();
            self.shared_set.replace(&names, now).await?;
            names
        } else {
            self.shared_set.members().await?
        };

        guard.release().await?;
        Ok(result)
    }
}

/// `true` if the cached set was never populated, or was populated more
/// than `ttl_secs` ago.
fn is_stale(last_refresh: Option<i64>, now: i64, ttl_secs: i64) -> bool {
    match last_refresh {
        Some(last) => now - last > ttl_secs,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_refreshed_is_stale() {
        assert!(is_stale(None, 1_000, 5));
    }

    #[test]
    fn within_ttl_is_fresh() {
        assert!(!is_stale(Some(998), 1_000, 5));
    }

    #[test]
    fn past_ttl_is_stale() {
        assert!(is_stale(Some(990), 1_000, 5));
    }
}
