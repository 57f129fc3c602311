use thiserror::Error;

pub type KvResult<T> = Result<T, KvError>;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("lock {0:?} could not be acquired within its TTL")]
    LockTimeout(String),
}
