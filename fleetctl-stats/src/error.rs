use thiserror::Error;

pub type StatsResult<T> = Result<T, StatsError>;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("node name {0:?} is not safe for identifier interpolation")]
    InvalidNodeName(String),

    #[error("node {0:?} is not registered")]
    NotRegistered(String),
}

impl From<fleetctl_types::NodeNameError> for StatsError {
    fn from(e: fleetctl_types::NodeNameError) -> Self {
        StatsError::InvalidNodeName(e.0)
    }
}
