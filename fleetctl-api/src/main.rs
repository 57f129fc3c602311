//! Process entry point: loads configuration, wires every component, spawns
//! the two reconciler loops, and serves the HTTP surface (spec.md §6, §7).
//!
//! Startup failures are fatal (spec.md §7: "a failed connection to Redis or
//! Postgres during startup exits the process rather than retrying
//! indefinitely") — every fallible step here propagates via `?` out of
//! `main`, following `knhk-sidecar`'s `Result<(), Box<dyn Error>>` +
//! `axum::serve` bind pattern.

mod error;
mod routes;
mod state;

use fleetctl_cluster::kube_adapter::KubeClusterAdapter;
use fleetctl_cluster::ClusterAdapter;
use fleetctl_config::FleetConfig;
use fleetctl_core::{
    KeepaliveIntake, OnlineNodeCache, Registrar, SchedulabilityController, ShutdownIntake,
    StaleNodeReaper,
};
use fleetctl_estimator::SurvivalEstimator;
use fleetctl_kv::{KeepaliveStore, LockService, RedisHandle, SharedSetStore};
use fleetctl_stats::StatsStore;
use fleetctl_vpn::{HttpVpnIssuer, VpnIssuer};
use state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = FleetConfig::load()?;

    let redis = RedisHandle::connect(&config.redis_ip, config.redis_password.as_deref()).await?;
    let stats = StatsStore::connect(
        &config.postgres_host,
        &config.postgres_user,
        &config.postgres_password,
    )
    .await?;

    let cluster: Arc<dyn ClusterAdapter> =
        Arc::new(KubeClusterAdapter::from_kubeconfig_yaml(&config.kubeconfig_yaml).await?);

    let vpn: Arc<dyn VpnIssuer> = Arc::new(HttpVpnIssuer::new(
        config.vpn_issuer_url.clone(),
        config.vpn_token.clone(),
    ));

    let keepalive_store = KeepaliveStore::new(redis.clone());
    let lock = LockService::new(redis.clone());
    let shared_set = SharedSetStore::new(redis.clone());

    let registrar = Arc::new(Registrar::new(
        stats.clone(),
        config.cluster_host.clone(),
        config.k3s_node_token.clone(),
        vpn,
    ));
    let keepalive = Arc::new(KeepaliveIntake::new(
        keepalive_store.clone(),
        redis.clone(),
        stats.clone(),
    ));
    let online_cache = Arc::new(OnlineNodeCache::new(shared_set, lock.clone(), cluster.clone()));
    let shutdown = Arc::new(ShutdownIntake::new(online_cache.clone(), cluster.clone()));
    let estimator = SurvivalEstimator::new(stats.clone());

    let reaper = Arc::new(StaleNodeReaper::new(
        cluster.clone(),
        keepalive_store,
        stats.clone(),
        lock.clone(),
    ));
    tokio::spawn(reaper.run());

    let schedulability = Arc::new(SchedulabilityController::new(
        cluster.clone(),
        estimator.clone(),
    ));
    tokio::spawn(schedulability.run());

    let app_state = AppState::new(
        registrar,
        keepalive,
        shutdown,
        online_cache,
        stats,
        estimator,
        cluster.clone(),
    );
    let app = routes::router(app_state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "fleetctl-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
