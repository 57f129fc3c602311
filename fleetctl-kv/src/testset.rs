//! Atomic test-and-set (`SET key value EX ttl NX` semantics), used by C9 to
//! gate at most one statistics increment per 10s bucket per node
//! (spec.md §4.8). Reproduces the original's Redis Lua script so the
//! atomicity is a server-side guarantee, not a client-side race.

use crate::{KvResult, RedisHandle};

const TEST_AND_SET_SCRIPT: &str = r#"
if redis.call("exists", KEYS[1]) == 1 then
    return 0
else
    redis.call("setex", KEYS[1], ARGV[2], ARGV[1])
    return 1
end
"#;

/// Returns `true` if `key` was absent and has now been set (i.e. the
/// caller won the race and should proceed); `false` if another caller
/// already won within the TTL window.
pub async fn test_and_set(
    redis: &RedisHandle,
    key: &str,
    ttl: std::time::Duration,
) -> KvResult<bool> {
    let mut conn = redis.connection();
    let won: i64 = redis::Script::new(TEST_AND_SET_SCRIPT)
        .key(key)
        .arg(1)
        .arg(ttl.as_secs().max(1))
        .invoke_async(&mut conn)
        .await?;
    Ok(won == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a local Redis instance; run via `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires a local Redis instance"]
    async fn second_call_within_ttl_loses_the_race() {
        let redis = RedisHandle::connect("127.0.0.1:6379", None).await.unwrap();
        let key = "kv-testset-test-dedupe";
        let ttl = std::time::Duration::from_secs(2);

        assert!(test_and_set(&redis, key, ttl).await.unwrap());
        assert!(!test_and_set(&redis, key, ttl).await.unwrap());

        tokio::time::sleep(ttl + std::time::Duration::from_millis(200)).await;
        assert!(test_and_set(&redis, key, ttl).await.unwrap());
    }
}
