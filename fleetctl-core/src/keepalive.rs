//! Keepalive Intake (C9, spec.md §4.8).

use crate::error::CoreResult;
use fleetctl_kv::{KeepaliveStore, RedisHandle};
use fleetctl_stats::StatsStore;
use fleetctl_types::buckets::SECONDS_PER_CHECK_IN;
use fleetctl_types::NODE_TIMEOUT;
use std::time::Duration;

const DEDUPE_TTL: Duration = Duration::from_secs(2 * SECONDS_PER_CHECK_IN as u64);
const DEDUPE_PREFIX: &str = "keepalive-dedupe";

pub struct KeepaliveIntake {
    keepalive: KeepaliveStore,
    redis: RedisHandle,
    stats: StatsStore,
}

impl KeepaliveIntake {
    pub fn new(keepalive: KeepaliveStore, redis: RedisHandle, stats: StatsStore) -> Self {
        Self {
            keepalive,
            redis,
            stats,
        }
    }

    /// 1. refresh the liveness key; 2. gate a statistics increment behind
    /// an atomic test-and-set so duplicate pulses inside the same 10 s
    /// bucket increment at most once (spec.md §8's testable property). A
    /// node that pulses before it is registered still gets its liveness
    /// key refreshed; the statistics increment is silently skipped
    /// (spec.md §4.2, §6: this route has no documented 404 case).
    #[tracing::instrument(skip(self))]
    pub async fn pulse(&self, node_id: &str) -> CoreResult<()> {
        self.keepalive.put(node_id, NODE_TIMEOUT).await?;

        let dedupe_key = format!("{DEDUPE_PREFIX}-{node_id}");
        let won = fleetctl_kv::test_and_set(&self.redis, &dedupe_key, DEDUPE_TTL).await?;
        if won && !self.stats.update_node(node_id, chrono::Utc::now()).await? {
            tracing::debug!(node = %node_id, "keepalive pulse for unregistered node");
        }
        Ok(())
    }
}
