//! Redis-backed half of C11's online-node cache (spec.md §4.10).
//!
//! `fleetctl-core` owns the refresh policy (5s staleness check under
//! `connected-nodes-lock`); this module only owns the two Redis keys that
//! back it, so every replica reads/writes the same shared state rather
//! than keeping a replica-local cache (grounded on
//! `node_maintainer.py::get_online_nodes`'s `RedisSet` usage).

use crate::{KvResult, RedisHandle};
use redis::AsyncCommands;
use std::collections::HashSet;

const SET_KEY: &str = "connected-nodes-set";
const TIME_KEY: &str = "connected-nodes-set-time";

#[derive(Clone)]
pub struct SharedSetStore {
    redis: RedisHandle,
}

impl SharedSetStore {
    pub fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }

    pub async fn members(&self) -> KvResult<HashSet<String>> {
        let mut conn = self.redis.connection();
        let members: HashSet<String> = conn.smembers(SET_KEY).await?;
        Ok(members)
    }

    /// Unix timestamp (seconds) of the last refresh, or `None` if the set
    /// has never been populated.
    pub async fn last_refresh(&self) -> KvResult<Option<i64>> {
        let mut conn = self.redis.connection();
        let ts: Option<i64> = conn.get(TIME_KEY).await?;
        Ok(ts)
    }

    /// Atomically replace the set's contents and stamp the refresh time.
    /// Callers must hold `connected-nodes-lock` (C3) while calling this.
    pub async fn replace(&self, names: &HashSet<String>, now: i64) -> KvResult<()> {
        let mut conn = self.redis.connection();
        let mut pipe = redis::pipe();
        pipe.atomic().del(SET_KEY).ignore();
        if !names.is_empty() {
            pipe.sadd(SET_KEY, names.iter().cloned().collect::<Vec<_>>())
                .ignore();
        }
        pipe.set(TIME_KEY, now).ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
