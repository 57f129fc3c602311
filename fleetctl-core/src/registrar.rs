//! Registrar (C8, spec.md §4.7).

use crate::error::{CoreError, CoreResult};
use dashmap::DashMap;
use fleetctl_stats::StatsStore;
use fleetctl_types::{NodeDetails, REGISTRATION_COOLDOWN};
use fleetctl_vpn::VpnIssuer;
use std::sync::Arc;
use std::time::Instant;

const CLUSTER_PORT: u16 = 6443;
const VPN_PORT: u16 = 30000;

/// Credentials handed back to a newly (or redundantly) registered node.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationDetails {
    pub k8s_ip: String,
    pub k8s_port: u16,
    pub k8s_token: String,
    pub vpn_ip: String,
    pub vpn_port: u16,
    pub vpn_token: String,
}

pub struct Registrar {
    stats: StatsStore,
    cluster_host: String,
    node_access_token: String,
    vpn: Arc<dyn VpnIssuer>,
    /// Per-replica, advisory dedupe — not authoritative (spec.md §3).
    cooldown: DashMap<String, Instant>,
}

impl Registrar {
    pub fn new(
        stats: StatsStore,
        cluster_host: impl Into<String>,
        node_access_token: impl Into<String>,
        vpn: Arc<dyn VpnIssuer>,
    ) -> Self {
        Self {
            stats,
            cluster_host: cluster_host.into(),
            node_access_token: node_access_token.into(),
            vpn,
            cooldown: DashMap::new(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn register(&self, node: &NodeDetails) -> CoreResult<RegistrationDetails> {
        let key = node.cooldown_key();
        if let Some(remaining) = cooldown_remaining(self.cooldown.get(&key).map(|r| *r), Instant::now()) {
            return Err(CoreError::CooldownActive(remaining));
        }

        self.stats.register_node(&node.name, chrono::Utc::now()).await?;
        self.cooldown.insert(key, Instant::now());

        let vpn_token = self.vpn.mint().await?;
        Ok(RegistrationDetails {
            k8s_ip: self.cluster_host.clone(),
            k8s_port: CLUSTER_PORT,
            k8s_token: self.node_access_token.clone(),
            vpn_ip: self.cluster_host.clone(),
            vpn_port: VPN_PORT,
            vpn_token,
        })
    }
}

/// `None` if `last` is absent or older than the cooldown window; otherwise
/// the remaining wait time. Split out from `register` so the dedupe logic
/// is testable without a live `StatsStore`.
fn cooldown_remaining(last: Option<Instant>, now: Instant) -> Option<std::time::Duration> {
    let elapsed = now.checked_duration_since(last?).unwrap_or_default();
    (elapsed < REGISTRATION_COOLDOWN).then(|| REGISTRATION_COOLDOWN - elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_key_is_name_and_id() {
        let node = NodeDetails::new("alpha", "1");
        assert_eq!(node.cooldown_key(), "alpha:1");
    }

    #[test]
    fn cooldown_blocks_within_window() {
        let now = Instant::now();
        let last = now - std::time::Duration::from_secs(2);
        assert!(cooldown_remaining(Some(last), now).is_some());
    }

    #[test]
    fn cooldown_clears_after_window() {
        let now = Instant::now();
        let last = now - REGISTRATION_COOLDOWN - std::time::Duration::from_secs(1);
        assert!(cooldown_remaining(Some(last), now).is_none());
    }

    #[test]
    fn no_prior_registration_has_no_cooldown() {
        assert!(cooldown_remaining(None, Instant::now()).is_none());
    }
}
