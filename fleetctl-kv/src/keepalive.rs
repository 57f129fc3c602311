//! C1 Keepalive Store (spec.md §4.1).

use crate::{KvResult, RedisHandle};
use redis::AsyncCommands;
use std::time::Duration;

const KEEPALIVE_PREFIX: &str = "node-keepalive-prefix";

/// Short-TTL per-node liveness keys. Presence of a key means "recent
/// keepalive"; absence means "silent".
#[derive(Clone)]
pub struct KeepaliveStore {
    redis: RedisHandle,
}

impl KeepaliveStore {
    pub fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }

    /// Sets `node-keepalive-prefix-<node_key>` to the current timestamp
    /// with the given expiry, overwriting any existing value and resetting
    /// its TTL. Last writer wins; no ordering is assumed across concurrent
    /// puts to the same key (spec.md §5).
    pub async fn put(&self, node_key: &str, ttl: Duration) -> KvResult<()> {
        let mut conn = self.redis.connection();
        let now = chrono::Utc::now().timestamp();
        let _: () = conn
            .set_ex(key_for(node_key), now, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    pub async fn exists(&self, node_key: &str) -> KvResult<bool> {
        let mut conn = self.redis.connection();
        let exists: bool = conn.exists(key_for(node_key)).await?;
        Ok(exists)
    }
}

fn key_for(node_key: &str) -> String {
    format!("{KEEPALIVE_PREFIX}-{node_key}")
}
