use std::collections::BTreeMap;

/// The subset of `v1/Node` the reaper and schedulability controller act on
/// (spec.md §4.4, §4.5).
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub unschedulable: bool,
    /// `true` if the node's last reported condition type was `Ready`,
    /// used to decide graceful (cordon+drain) vs. ungraceful (taint) clean
    /// up (spec.md §4.4).
    pub last_condition_ready: bool,
}

impl NodeInfo {
    pub fn is_persistent(&self) -> bool {
        self.labels.contains_key(fleetctl_types::PERSISTENT_NODE_LABEL)
    }
}

/// The subset of `v1/Pod` the drain path needs.
#[derive(Debug, Clone)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub owned_by_daemonset: bool,
}
