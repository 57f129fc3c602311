//! Schedulability Controller (C6, spec.md §4.5).

use fleetctl_cluster::ClusterAdapter;
use fleetctl_estimator::SurvivalEstimator;
use fleetctl_types::{CORDON_THRESHOLD, NODE_MINIMAL_SURVIVABILITY_MINUTES, NODE_TIMEOUT};
use std::sync::Arc;

/// The reconciliation action a single node's survival estimate implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Cordon,
    Uncordon,
    None,
}

/// Pure decision: cordon at or below the threshold regardless of current
/// state; uncordon only a node that is currently unschedulable and has
/// recovered above the threshold; otherwise leave it alone.
fn decide(survival: f64, currently_unschedulable: bool) -> Action {
    if survival <= CORDON_THRESHOLD {
        Action::Cordon
    } else if currently_unschedulable {
        Action::Uncordon
    } else {
        Action::None
    }
}

pub struct SchedulabilityController {
    cluster: Arc<dyn ClusterAdapter>,
    estimator: SurvivalEstimator,
}

impl SchedulabilityController {
    pub fn new(cluster: Arc<dyn ClusterAdapter>, estimator: SurvivalEstimator) -> Self {
        Self { cluster, estimator }
    }

    /// Runs the `NODE_TIMEOUT`-period loop forever. Per-node estimator
    /// failures are logged and skip only that node; loop-level failures
    /// are logged and the loop continues (spec.md §4.5).
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(NODE_TIMEOUT);
        loop {
            interval.tick().await;
            if let Err(e) = self.tick().await {
                tracing::warn!(error = %e, "schedulability tick failed");
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn tick(&self) -> fleetctl_cluster::ClusterResult<()> {
        let nodes = self.cluster.list_nodes().await?;

        for node in nodes.iter().filter(|n| !n.is_persistent()) {
            let now = chrono::Utc::now();
            let survival = self
                .estimator
                .survival_chance(&node.name, NODE_MINIMAL_SURVIVABILITY_MINUTES, now)
                .await;

            let p = match survival {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(node = %node.name, error = %e, "survival estimate failed");
                    continue;
                }
            };

            let cluster = self.cluster.clone();
            let name = node.name.clone();
            match decide(p, node.unschedulable) {
                Action::Cordon => {
                    tokio::spawn(async move {
                        if let Err(e) = cluster.cordon_and_drain(&name).await {
                            tracing::warn!(node = %name, error = %e, "cordon_and_drain failed");
                        }
                    });
                }
                Action::Uncordon => {
                    tokio::spawn(async move {
                        if let Err(e) = cluster.uncordon_and_untaint(&name).await {
                            tracing::warn!(node = %name, error = %e, "uncordon_and_untaint failed");
                        }
                    });
                }
                Action::None => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cordons_at_or_below_threshold_regardless_of_state() {
        assert_eq!(decide(CORDON_THRESHOLD, false), Action::Cordon);
        assert_eq!(decide(0.0, true), Action::Cordon);
    }

    #[test]
    fn uncordons_recovered_unschedulable_node() {
        assert_eq!(decide(CORDON_THRESHOLD + 0.01, true), Action::Uncordon);
    }

    #[test]
    fn leaves_healthy_schedulable_node_alone() {
        assert_eq!(decide(0.9, false), Action::None);
    }
}
