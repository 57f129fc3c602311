//! `kube`/`k8s-openapi` implementation of [`crate::ClusterAdapter`].
//!
//! Three independent clients back this adapter, mirroring
//! `node_maintainer.py`'s `_kube_client` / `_deletion_kube_client` /
//! `_restore_kube_client`: one for list traffic, one for the delete path,
//! one for the cordon/uncordon/taint path, so a slow delete under load
//! cannot starve the reaper's next list call.

use crate::error::{ClusterError, ClusterResult};
use crate::model::{NodeInfo, PodInfo};
use crate::ClusterAdapter;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DeleteParams, EvictParams, ListParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde_json::json;

pub struct KubeClusterAdapter {
    read_nodes: Api<Node>,
    delete_nodes: Api<Node>,
    mutate_nodes: Api<Node>,
    mutate_pods: Api<Pod>,
    mutate_client: Client,
    kubeconfig_yaml: String,
}

impl KubeClusterAdapter {
    /// Builds three `kube::Client`s from one kubeconfig's YAML text.
    pub async fn from_kubeconfig_yaml(yaml: &str) -> ClusterResult<Self> {
        let kubeconfig = Kubeconfig::from_yaml(yaml)
            .map_err(|e| ClusterError::InvalidKubeconfig(e.to_string()))?;
        let opts = KubeConfigOptions::default();

        let read_config = Config::from_custom_kubeconfig(kubeconfig.clone(), &opts)
            .await
            .map_err(|e| ClusterError::InvalidKubeconfig(e.to_string()))?;
        let delete_config = Config::from_custom_kubeconfig(kubeconfig.clone(), &opts)
            .await
            .map_err(|e| ClusterError::InvalidKubeconfig(e.to_string()))?;
        let mutate_config = Config::from_custom_kubeconfig(kubeconfig, &opts)
            .await
            .map_err(|e| ClusterError::InvalidKubeconfig(e.to_string()))?;

        let read_client = Client::try_from(read_config)?;
        let delete_client = Client::try_from(delete_config)?;
        let mutate_client = Client::try_from(mutate_config)?;

        Ok(Self {
            read_nodes: Api::all(read_client),
            delete_nodes: Api::all(delete_client),
            mutate_nodes: Api::all(mutate_client.clone()),
            mutate_pods: Api::all(mutate_client.clone()),
            mutate_client,
            kubeconfig_yaml: yaml.to_string(),
        })
    }
}

#[async_trait]
impl ClusterAdapter for KubeClusterAdapter {
    async fn list_nodes(&self) -> ClusterResult<Vec<NodeInfo>> {
        let nodes = self.read_nodes.list(&ListParams::default()).await?;
        Ok(nodes.items.into_iter().map(node_info).collect())
    }

    async fn list_pods_on_node(&self, node_name: &str) -> ClusterResult<Vec<PodInfo>> {
        let params =
            ListParams::default().fields(&format!("spec.nodeName={node_name}"));
        let pods = self.mutate_pods.list(&params).await?;
        Ok(pods.items.into_iter().map(pod_info).collect())
    }

    async fn patch_unschedulable(&self, node_name: &str, unschedulable: bool) -> ClusterResult<()> {
        let patch = json!({ "spec": { "unschedulable": unschedulable } });
        self.mutate_nodes
            .patch(node_name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn clear_taints(&self, node_name: &str) -> ClusterResult<()> {
        let patch = json!({ "spec": { "taints": [] } });
        self.mutate_nodes
            .patch(node_name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn taint_out_of_service(&self, node_name: &str) -> ClusterResult<()> {
        let patch = json!({
            "spec": {
                "taints": [{
                    "effect": fleetctl_types::OUT_OF_SERVICE_TAINT_EFFECT,
                    "key": fleetctl_types::OUT_OF_SERVICE_TAINT_KEY,
                    "value": fleetctl_types::OUT_OF_SERVICE_TAINT_VALUE,
                }]
            }
        });
        self.mutate_nodes
            .patch(node_name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn evict_pod(&self, namespace: &str, pod_name: &str) -> ClusterResult<()> {
        let pods: Api<Pod> = Api::namespaced(self.mutate_client.clone(), namespace);
        pods.evict(pod_name, &EvictParams::default()).await?;
        Ok(())
    }

    async fn delete_node(&self, node_name: &str) -> ClusterResult<()> {
        self.delete_nodes
            .delete(node_name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn read_kubeconfig(&self) -> ClusterResult<String> {
        Ok(self.kubeconfig_yaml.clone())
    }
}

fn node_info(node: Node) -> NodeInfo {
    let labels = node
        .metadata
        .labels
        .unwrap_or_default()
        .into_iter()
        .collect();
    let unschedulable = node
        .spec
        .and_then(|s| s.unschedulable)
        .unwrap_or(false);
    let last_condition_ready = node
        .status
        .and_then(|s| s.conditions)
        .and_then(|c| c.last().cloned())
        .map(|c| c.type_ == "Ready")
        .unwrap_or(false);
    NodeInfo {
        name: node.metadata.name.unwrap_or_default(),
        labels,
        unschedulable,
        last_condition_ready,
    }
}

fn pod_info(pod: Pod) -> PodInfo {
    let owned_by_daemonset = pod
        .metadata
        .owner_references
        .as_ref()
        .and_then(|refs| refs.first())
        .map(|r| r.kind == "DaemonSet")
        .unwrap_or(false);
    PodInfo {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: pod.metadata.namespace.unwrap_or_default(),
        owned_by_daemonset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeCondition, NodeSpec, NodeStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
    use std::collections::BTreeMap;

    #[test]
    fn node_info_extracts_labels_unschedulable_and_ready_condition() {
        let mut labels = BTreeMap::new();
        labels.insert(
            fleetctl_types::PERSISTENT_NODE_LABEL.to_string(),
            "true".to_string(),
        );
        let node = Node {
            metadata: ObjectMeta {
                name: Some("worker-1".to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                unschedulable: Some(true),
                ..Default::default()
            }),
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        };

        let info = node_info(node);
        assert_eq!(info.name, "worker-1");
        assert!(info.unschedulable);
        assert!(info.last_condition_ready);
        assert!(info.is_persistent());
    }

    #[test]
    fn node_info_defaults_missing_spec_and_status() {
        let node = Node {
            metadata: ObjectMeta {
                name: Some("worker-2".to_string()),
                ..Default::default()
            },
            spec: None,
            status: None,
        };

        let info = node_info(node);
        assert!(!info.unschedulable);
        assert!(!info.last_condition_ready);
        assert!(!info.is_persistent());
    }

    #[test]
    fn pod_info_flags_daemonset_ownership() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("pod-a".to_string()),
                namespace: Some("kube-system".to_string()),
                owner_references: Some(vec![OwnerReference {
                    kind: "DaemonSet".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            spec: None,
            status: None,
        };

        let info = pod_info(pod);
        assert_eq!(info.namespace, "kube-system");
        assert!(info.owned_by_daemonset);
    }

    #[test]
    fn pod_info_unowned_pod_is_not_daemonset() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("pod-b".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: None,
            status: None,
        };

        let info = pod_info(pod);
        assert!(!info.owned_by_daemonset);
    }
}
