//! Redis-backed primitives shared by C1 (Keepalive Store), C3 (Distributed
//! Lock Service), and the Redis-resident parts of C9's test-and-set gate
//! and C11's online-node cache (spec.md §4.1, §4.3, §4.8, §4.10).
//!
//! All of it goes through one `redis::aio::ConnectionManager`-backed
//! handle — `ConnectionManager` already reconnects transparently, so every
//! module here just issues commands against a cloned handle rather than
//! holding its own pool.

pub mod error;
pub mod keepalive;
pub mod lock;
pub mod shared_set;
pub mod testset;

pub use error::{KvError, KvResult};
pub use keepalive::KeepaliveStore;
pub use lock::{LockGuard, LockService};
pub use shared_set::SharedSetStore;
pub use testset::test_and_set;

use redis::aio::ConnectionManager;

/// A cheaply-cloneable handle to the shared Redis connection.
#[derive(Clone)]
pub struct RedisHandle {
    manager: ConnectionManager,
}

impl RedisHandle {
    /// Connect to `redis://[:password@]host:port`. `password` is applied
    /// via `AUTH` if supplied (spec.md §6: `REDIS_IP`, `REDIS_PASSWORD`).
    pub async fn connect(host: &str, password: Option<&str>) -> KvResult<Self> {
        let url = match password {
            Some(pw) if !pw.is_empty() => format!("redis://:{pw}@{host}"),
            _ => format!("redis://{host}"),
        };
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    pub(crate) fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}
