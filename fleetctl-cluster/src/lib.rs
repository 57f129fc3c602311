//! C4 Cluster Adapter (spec.md §4.4's `clean_up`, §4.5, §5).
//!
//! `ClusterAdapter` is a trait so the reconciler loops in `fleetctl-core`
//! can be driven by a fake in tests; [`KubeClusterAdapter`] is the
//! `kube`/`k8s-openapi` implementation used in production, grounded on
//! `node_maintainer.py`'s three separate `CoreV1Api` clients.

pub mod error;
pub mod kube_adapter;
pub mod model;

pub use error::{ClusterError, ClusterResult};
pub use kube_adapter::KubeClusterAdapter;
pub use model::{NodeInfo, PodInfo};

use async_trait::async_trait;

/// Everything the reaper (C5) and schedulability controller (C6) need from
/// the cluster. Mutation methods are deliberately separate from the list
/// methods so an implementation can route them through different clients
/// (spec.md §5: "at least two independent adapter clients").
#[async_trait]
pub trait ClusterAdapter: Send + Sync {
    async fn list_nodes(&self) -> ClusterResult<Vec<NodeInfo>>;
    async fn list_pods_on_node(&self, node_name: &str) -> ClusterResult<Vec<PodInfo>>;

    async fn patch_unschedulable(&self, node_name: &str, unschedulable: bool) -> ClusterResult<()>;
    async fn clear_taints(&self, node_name: &str) -> ClusterResult<()>;
    async fn taint_out_of_service(&self, node_name: &str) -> ClusterResult<()>;
    async fn evict_pod(&self, namespace: &str, pod_name: &str) -> ClusterResult<()>;
    async fn delete_node(&self, node_name: &str) -> ClusterResult<()>;

    /// Raw kubeconfig contents handed back by `GET /api/v1/cluster_access`
    /// (grounded on `cluster_access.py`, which re-reads the kubeconfig
    /// file on every request).
    async fn read_kubeconfig(&self) -> ClusterResult<String>;

    /// `cordon_and_drain`: cordon, list the node's non-DaemonSet pods,
    /// evict each, then delete the node object (spec.md §4.4).
    async fn cordon_and_drain(&self, node_name: &str) -> ClusterResult<()> {
        self.patch_unschedulable(node_name, true).await?;
        for pod in self.list_pods_on_node(node_name).await? {
            if pod.owned_by_daemonset {
                continue;
            }
            if let Err(e) = self.evict_pod(&pod.namespace, &pod.name).await {
                tracing::warn!(node = node_name, pod = %pod.name, error = %e, "eviction failed");
            }
        }
        Ok(())
    }

    /// `uncordon_and_untaint`: clears both `spec.unschedulable` and
    /// `spec.taints` (spec.md §4.5).
    async fn uncordon_and_untaint(&self, node_name: &str) -> ClusterResult<()> {
        self.patch_unschedulable(node_name, false).await?;
        self.clear_taints(node_name).await
    }

    /// `clean_up`: graceful shutdowns are cordoned and drained; ungraceful
    /// ones are tainted out-of-service. Both end in node deletion
    /// (spec.md §4.4).
    async fn clean_up(&self, node_name: &str, ready: bool) -> ClusterResult<()> {
        if ready {
            self.cordon_and_drain(node_name).await?;
        } else {
            self.taint_out_of_service(node_name).await?;
        }
        self.delete_node(node_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call it receives instead of touching a cluster, so
    /// the default-implemented methods above can be exercised without a
    /// live `kube::Client`.
    #[derive(Default)]
    struct FakeClusterAdapter {
        pods: Vec<PodInfo>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeClusterAdapter {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClusterAdapter for FakeClusterAdapter {
        async fn list_nodes(&self) -> ClusterResult<Vec<NodeInfo>> {
            Ok(Vec::new())
        }

        async fn list_pods_on_node(&self, _node_name: &str) -> ClusterResult<Vec<PodInfo>> {
            Ok(self.pods.clone())
        }

        async fn patch_unschedulable(&self, node_name: &str, unschedulable: bool) -> ClusterResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("patch_unschedulable({node_name}, {unschedulable})"));
            Ok(())
        }

        async fn clear_taints(&self, node_name: &str) -> ClusterResult<()> {
            self.calls.lock().unwrap().push(format!("clear_taints({node_name})"));
            Ok(())
        }

        async fn taint_out_of_service(&self, node_name: &str) -> ClusterResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("taint_out_of_service({node_name})"));
            Ok(())
        }

        async fn evict_pod(&self, namespace: &str, pod_name: &str) -> ClusterResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("evict_pod({namespace}/{pod_name})"));
            Ok(())
        }

        async fn delete_node(&self, node_name: &str) -> ClusterResult<()> {
            self.calls.lock().unwrap().push(format!("delete_node({node_name})"));
            Ok(())
        }

        async fn read_kubeconfig(&self) -> ClusterResult<String> {
            Ok(String::new())
        }
    }

    fn pod(name: &str, namespace: &str, daemonset: bool) -> PodInfo {
        PodInfo {
            name: name.to_string(),
            namespace: namespace.to_string(),
            owned_by_daemonset: daemonset,
        }
    }

    #[tokio::test]
    async fn cordon_and_drain_evicts_only_non_daemonset_pods() {
        let adapter = FakeClusterAdapter {
            pods: vec![
                pod("app-1", "default", false),
                pod("fluentbit-1", "kube-system", true),
            ],
            ..Default::default()
        };

        adapter.cordon_and_drain("worker-1").await.unwrap();

        assert_eq!(
            adapter.calls(),
            vec![
                "patch_unschedulable(worker-1, true)".to_string(),
                "evict_pod(default/app-1)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn uncordon_and_untaint_clears_both_fields_in_order() {
        let adapter = FakeClusterAdapter::default();

        adapter.uncordon_and_untaint("worker-1").await.unwrap();

        assert_eq!(
            adapter.calls(),
            vec![
                "patch_unschedulable(worker-1, false)".to_string(),
                "clear_taints(worker-1)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn clean_up_drains_ready_nodes_and_taints_unready_ones_before_deleting() {
        let ready = FakeClusterAdapter::default();
        ready.clean_up("worker-1", true).await.unwrap();
        assert_eq!(
            ready.calls(),
            vec![
                "patch_unschedulable(worker-1, true)".to_string(),
                "delete_node(worker-1)".to_string(),
            ]
        );

        let unready = FakeClusterAdapter::default();
        unready.clean_up("worker-2", false).await.unwrap();
        assert_eq!(
            unready.calls(),
            vec![
                "taint_out_of_service(worker-2)".to_string(),
                "delete_node(worker-2)".to_string(),
            ]
        );
    }
}
