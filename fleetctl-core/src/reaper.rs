//! Stale-Node Reaper (C5, spec.md §4.4).

use crate::error::CoreResult;
use fleetctl_cluster::{ClusterAdapter, NodeInfo};
use fleetctl_kv::{KeepaliveStore, LockService};
use fleetctl_stats::StatsStore;
use fleetctl_types::NODE_TIMEOUT;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const CLEANUP_LOCK: &str = "cluster-access-cleanup-lock";

/// Grace-period-aware stale-node detector. The `grace_set` is
/// deliberately replica-local (spec.md §9): convergence happens because
/// whichever replica observes two consecutive silent ticks first wins the
/// cleanup lock and deletes the node.
pub struct StaleNodeReaper {
    cluster: Arc<dyn ClusterAdapter>,
    keepalive: KeepaliveStore,
    stats: StatsStore,
    lock: LockService,
    grace_set: Mutex<HashSet<String>>,
}

impl StaleNodeReaper {
    pub fn new(
        cluster: Arc<dyn ClusterAdapter>,
        keepalive: KeepaliveStore,
        stats: StatsStore,
        lock: LockService,
    ) -> Self {
        Self {
            cluster,
            keepalive,
            stats,
            lock,
            grace_set: Mutex::new(HashSet::new()),
        }
    }

    /// Runs the `NODE_TIMEOUT`-period loop forever. Per-tick errors are
    /// logged and swallowed (spec.md §7: "background loops never
    /// terminate on error").
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(NODE_TIMEOUT);
        loop {
            interval.tick().await;
            if let Err(e) = self.tick().await {
                tracing::warn!(error = %e, "stale-node reaper tick failed");
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn tick(&self) -> CoreResult<()> {
        let nodes = self.cluster.list_nodes().await?;

        let guard = match self.lock.lock(CLEANUP_LOCK, NODE_TIMEOUT).await? {
            Some(g) => g,
            None => {
                tracing::debug!("cleanup lock unavailable within TTL, skipping tick");
                return Ok(());
            }
        };

        for node in nodes.iter().filter(|n| !n.is_persistent()) {
            if let Err(e) = self.check_node(node).await {
                tracing::warn!(node = %node.name, error = %e, "reaper failed to process node");
            }
        }

        guard.release().await?;
        Ok(())
    }

    async fn check_node(&self, node: &NodeInfo) -> CoreResult<()> {
        let present = self.keepalive.exists(&node.name).await?;

        let confirmed_stale = {
            let mut grace_set = self.grace_set.lock().unwrap();
            evaluate_grace(&mut grace_set, &node.name, present)
        };

        if !confirmed_stale {
            return Ok(());
        }

        self.stats.increment_abrupt_disconnect(&node.name).await?;

        let cluster = self.cluster.clone();
        let name = node.name.clone();
        let ready = node.last_condition_ready;
        tokio::spawn(async move {
            if let Err(e) = cluster.clean_up(&name, ready).await {
                tracing::warn!(node = %name, error = %e, "clean_up failed");
            }
        });
        Ok(())
    }
}

/// One replica's grace-period state machine for a single node: present
/// clears the grace flag; the first silent observation sets it; the
/// second consecutive silent observation confirms staleness and clears
/// the flag again so the next cycle starts fresh.
fn evaluate_grace(grace_set: &mut HashSet<String>, name: &str, present: bool) -> bool {
    if present {
        grace_set.remove(name);
        false
    } else if grace_set.insert(name.to_string()) {
        false
    } else {
        grace_set.remove(name);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_node_never_confirmed_stale() {
        let mut grace_set = HashSet::new();
        assert!(!evaluate_grace(&mut grace_set, "alpha", true));
        assert!(grace_set.is_empty());
    }

    #[test]
    fn first_silent_tick_is_not_stale() {
        let mut grace_set = HashSet::new();
        assert!(!evaluate_grace(&mut grace_set, "alpha", false));
        assert!(grace_set.contains("alpha"));
    }

    #[test]
    fn second_consecutive_silent_tick_confirms_stale() {
        let mut grace_set = HashSet::new();
        evaluate_grace(&mut grace_set, "alpha", false);
        assert!(evaluate_grace(&mut grace_set, "alpha", false));
        assert!(grace_set.is_empty());
    }

    #[test]
    fn reappearing_between_silent_ticks_resets_grace() {
        let mut grace_set = HashSet::new();
        evaluate_grace(&mut grace_set, "alpha", false);
        evaluate_grace(&mut grace_set, "alpha", true);
        assert!(!evaluate_grace(&mut grace_set, "alpha", false));
        assert!(grace_set.contains("alpha"));
    }
}
