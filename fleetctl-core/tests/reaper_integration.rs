//! Exercises `StaleNodeReaper::tick()` end to end against a fake
//! `ClusterAdapter`, confirming the grace-period state machine drives a
//! real `clean_up` call only for a node that has gone silent for two
//! consecutive ticks, and never for a persistent-labeled node.
//!
//! Requires a local Redis and Postgres (`REDIS_IP`/`POSTGRES_HOST` default
//! to `127.0.0.1`); run explicitly via `cargo test -- --ignored`.

use async_trait::async_trait;
use fleetctl_cluster::{ClusterAdapter, ClusterResult, NodeInfo, PodInfo};
use fleetctl_core::StaleNodeReaper;
use fleetctl_kv::{KeepaliveStore, LockService, RedisHandle};
use fleetctl_stats::StatsStore;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

struct FakeClusterAdapter {
    nodes: Vec<NodeInfo>,
    cleaned_up: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ClusterAdapter for FakeClusterAdapter {
    async fn list_nodes(&self) -> ClusterResult<Vec<NodeInfo>> {
        Ok(self.nodes.clone())
    }

    async fn list_pods_on_node(&self, _node_name: &str) -> ClusterResult<Vec<PodInfo>> {
        Ok(Vec::new())
    }

    async fn patch_unschedulable(&self, _node_name: &str, _unschedulable: bool) -> ClusterResult<()> {
        Ok(())
    }

    async fn clear_taints(&self, _node_name: &str) -> ClusterResult<()> {
        Ok(())
    }

    async fn taint_out_of_service(&self, _node_name: &str) -> ClusterResult<()> {
        Ok(())
    }

    async fn evict_pod(&self, _namespace: &str, _pod_name: &str) -> ClusterResult<()> {
        Ok(())
    }

    async fn delete_node(&self, node_name: &str) -> ClusterResult<()> {
        self.cleaned_up.lock().unwrap().push(node_name.to_string());
        Ok(())
    }

    async fn read_kubeconfig(&self) -> ClusterResult<String> {
        Ok(String::new())
    }
}

fn node(name: &str, persistent: bool) -> NodeInfo {
    let mut labels = BTreeMap::new();
    if persistent {
        labels.insert(fleetctl_types::PERSISTENT_NODE_LABEL.to_string(), "true".to_string());
    }
    NodeInfo {
        name: name.to_string(),
        labels,
        unschedulable: false,
        last_condition_ready: true,
    }
}

#[tokio::test]
#[ignore = "requires a local Redis and Postgres instance"]
async fn two_consecutive_silent_ticks_clean_up_a_non_persistent_node() {
    let redis = RedisHandle::connect("127.0.0.1:6379", None).await.unwrap();
    let stats = StatsStore::connect("127.0.0.1", "postgres", "postgres")
        .await
        .unwrap();
    let keepalive = KeepaliveStore::new(redis.clone());
    let lock = LockService::new(redis.clone());

    stats
        .register_node("reaper-silent-node", chrono::Utc::now())
        .await
        .unwrap();
    stats
        .register_node("reaper-persistent-node", chrono::Utc::now())
        .await
        .unwrap();

    let cleaned_up = Arc::new(Mutex::new(Vec::new()));
    let cluster = Arc::new(FakeClusterAdapter {
        nodes: vec![
            node("reaper-silent-node", false),
            node("reaper-persistent-node", true),
        ],
        cleaned_up: cleaned_up.clone(),
    });

    let reaper = Arc::new(StaleNodeReaper::new(
        cluster.clone(),
        keepalive,
        stats,
        lock,
    ));

    // Neither node has ever sent a keepalive, so both ticks observe
    // "silent". First tick only arms the grace period.
    reaper.tick().await.unwrap();
    assert!(cleaned_up.lock().unwrap().is_empty());

    // Second consecutive silent tick confirms staleness for the
    // non-persistent node; the cleanup itself runs on a detached task, so
    // give it a moment to land.
    reaper.tick().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let cleaned = cleaned_up.lock().unwrap().clone();
    assert_eq!(cleaned, vec!["reaper-silent-node".to_string()]);
}
