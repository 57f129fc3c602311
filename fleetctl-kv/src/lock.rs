//! C3 Distributed Lock Service (spec.md §4.3).
//!
//! A single-node `SET NX PX` lock with a random release token, matching
//! the original's `pottery.Redlock` usage against a single Redis master
//! (see `SPEC_FULL.md` §2/C3) — a quorum is unnecessary when there is one
//! authoritative Redis. Locks held beyond their TTL are forcibly
//! reclaimable: the key simply expires.

use crate::{KvResult, RedisHandle};
use rand::Rng;
use redis::AsyncCommands;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;
use uuid::Uuid;

const RETRY_BACKOFF: Duration = Duration::from_millis(20);
const RETRY_BACKOFF_JITTER_MS: u64 = 10;
const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct LockService {
    redis: RedisHandle,
}

impl LockService {
    pub fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }

    /// Attempt to acquire `name` for up to `ttl`. Returns `None` if the
    /// lock could not be acquired within that window — callers (the
    /// reaper) treat this as "skip this tick" per spec.md §7.
    pub async fn lock(&self, name: &str, ttl: Duration) -> KvResult<Option<LockGuard>> {
        let token = Uuid::new_v4().to_string();
        let key = lock_key(name);
        let deadline = Instant::now() + ttl;
        let ttl_ms = ttl.as_millis().max(1) as usize;

        loop {
            let mut conn = self.redis.connection();
            let acquired: bool = redis::cmd("SET")
                .arg(&key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async::<Option<String>>(&mut conn)
                .await?
                .is_some();

            if acquired {
                return Ok(Some(LockGuard {
                    redis: self.redis.clone(),
                    key,
                    token,
                }));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..RETRY_BACKOFF_JITTER_MS));
            tokio::time::sleep(RETRY_BACKOFF + jitter).await;
        }
    }

    /// Scope `f` so the lock is released on every exit path, including a
    /// panic inside `f` (the guard's `Drop` releases it best-effort).
    /// Returns `None` if the lock was not acquired within `ttl`.
    pub async fn with_lock<F, Fut, T>(&self, name: &str, ttl: Duration, f: F) -> KvResult<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.lock(name, ttl).await? {
            None => Ok(None),
            Some(guard) => {
                let result = f().await;
                guard.release().await?;
                Ok(Some(result))
            }
        }
    }
}

fn lock_key(name: &str) -> String {
    format!("lock:{name}")
}

/// Held while the lock is live. Releasing consumes the guard; dropping it
/// without an explicit release still frees the lock best-effort via a
/// detached task (so a panic in the critical section cannot leak it).
pub struct LockGuard {
    redis: RedisHandle,
    key: String,
    token: String,
}

impl LockGuard {
    pub async fn release(self) -> KvResult<()> {
        let mut conn = self.redis.connection();
        redis::Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.token)
            .invoke_async::<i64>(&mut conn)
            .await?;
        // Already released; skip the redundant best-effort release in Drop.
        std::mem::forget(self);
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let redis = self.redis.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        tokio::spawn(async move {
            let mut conn = redis.connection();
            if let Err(e) = redis::Script::new(RELEASE_SCRIPT)
                .key(&key)
                .arg(&token)
                .invoke_async::<i64>(&mut conn)
                .await
            {
                warn!(lock = %key, error = %e, "failed to release lock on drop");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_namespaced() {
        assert_eq!(lock_key("cluster-access-cleanup-lock"), "lock:cluster-access-cleanup-lock");
    }

    /// Requires a local Redis instance; run via `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires a local Redis instance"]
    async fn second_caller_is_blocked_until_first_releases() {
        let redis = RedisHandle::connect("127.0.0.1:6379", None).await.unwrap();
        let service = LockService::new(redis);
        let name = "kv-lock-test-contention";

        let first = service.lock(name, Duration::from_secs(5)).await.unwrap();
        assert!(first.is_some());

        let second = service.lock(name, Duration::from_millis(50)).await.unwrap();
        assert!(second.is_none(), "second caller must not acquire a held lock");

        first.unwrap().release().await.unwrap();

        let third = service.lock(name, Duration::from_secs(1)).await.unwrap();
        assert!(third.is_some(), "lock must be acquirable again once released");
        third.unwrap().release().await.unwrap();
    }
}
