//! Shared application state and the in-process response cache backing the
//! two cached query endpoints (spec.md §6, §9's open question on cache
//! placement — resolved here as an in-process `DashMap`, not a second
//! Redis path, since both values are cheap to recompute and replica-local
//! staleness is already how C11's online cache behaves).

use dashmap::DashMap;
use fleetctl_cluster::ClusterAdapter;
use fleetctl_core::{KeepaliveIntake, OnlineNodeCache, Registrar, ShutdownIntake};
use fleetctl_estimator::SurvivalEstimator;
use fleetctl_stats::StatsStore;
use fleetctl_types::{DISCONNECT_CACHE_TTL, SURVIVAL_CACHE_TTL};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub registrar: Arc<Registrar>,
    pub keepalive: Arc<KeepaliveIntake>,
    pub shutdown: Arc<ShutdownIntake>,
    pub online_cache: Arc<OnlineNodeCache>,
    pub stats: StatsStore,
    pub estimator: SurvivalEstimator,
    pub cluster: Arc<dyn ClusterAdapter>,
    survival_cache: Arc<DashMap<(String, u32), (f64, Instant)>>,
    disconnects_cache: Arc<DashMap<String, (f64, Instant)>>,
}

impl AppState {
    pub fn new(
        registrar: Arc<Registrar>,
        keepalive: Arc<KeepaliveIntake>,
        shutdown: Arc<ShutdownIntake>,
        online_cache: Arc<OnlineNodeCache>,
        stats: StatsStore,
        estimator: SurvivalEstimator,
        cluster: Arc<dyn ClusterAdapter>,
    ) -> Self {
        Self {
            registrar,
            keepalive,
            shutdown,
            online_cache,
            stats,
            estimator,
            cluster,
            survival_cache: Arc::new(DashMap::new()),
            disconnects_cache: Arc::new(DashMap::new()),
        }
    }

    pub fn cached_survival(&self, node_name: &str, minutes: u32) -> Option<f64> {
        let key = (node_name.to_string(), minutes);
        let entry = self.survival_cache.get(&key)?;
        let (value, at) = *entry;
        (at.elapsed() < SURVIVAL_CACHE_TTL).then_some(value)
    }

    pub fn cache_survival(&self, node_name: &str, minutes: u32, value: f64) {
        self.survival_cache
            .insert((node_name.to_string(), minutes), (value, Instant::now()));
    }

    pub fn cached_disconnect_score(&self, node_name: &str) -> Option<f64> {
        let entry = self.disconnects_cache.get(node_name)?;
        let (value, at) = *entry;
        (at.elapsed() < DISCONNECT_CACHE_TTL).then_some(value)
    }

    pub fn cache_disconnect_score(&self, node_name: &str, value: f64) {
        self.disconnects_cache
            .insert(node_name.to_string(), (value, Instant::now()));
    }
}
