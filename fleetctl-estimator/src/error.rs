use thiserror::Error;

pub type EstimatorResult<T> = Result<T, EstimatorError>;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("time range must be in [1, 1439] minutes, got {0}")]
    InvalidRange(u32),

    #[error("node {0:?} check-in data is corrupt: bucket count {1} exceeds expected {2}")]
    DataCorruption(String, i64, i64),

    #[error(transparent)]
    Stats(#[from] fleetctl_stats::StatsError),
}
