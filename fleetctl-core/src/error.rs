use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Error kinds from spec.md §7. `TransientBackend` wraps every
/// KV/relational/cluster I/O failure the underlying crates can raise;
/// everything else is a domain-level outcome the request surface maps to
/// a specific HTTP status.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("node is not registered")]
    NotRegistered,

    #[error("node was registered within the last {0:?}, retry later")]
    CooldownActive(std::time::Duration),

    #[error("time range must be in [1, 1439] minutes, got {0}")]
    InvalidRange(u32),

    #[error("check-in data is corrupt: bucket count {0} exceeds expected {1}")]
    DataCorruption(i64, i64),

    #[error(transparent)]
    TransientBackend(#[from] TransientBackendError),
}

/// Backend failures that are always transient from the core's point of
/// view: logged, background loops continue, request handlers surface a
/// 5xx.
#[derive(Debug, Error)]
pub enum TransientBackendError {
    #[error("kv store error: {0}")]
    Kv(#[from] fleetctl_kv::KvError),

    #[error("statistics store error: {0}")]
    Stats(#[from] fleetctl_stats::StatsError),

    #[error("cluster adapter error: {0}")]
    Cluster(#[from] fleetctl_cluster::ClusterError),

    #[error("vpn issuer error: {0}")]
    Vpn(#[from] fleetctl_vpn::VpnError),
}

impl From<fleetctl_kv::KvError> for CoreError {
    fn from(e: fleetctl_kv::KvError) -> Self {
        CoreError::TransientBackend(e.into())
    }
}

impl From<fleetctl_cluster::ClusterError> for CoreError {
    fn from(e: fleetctl_cluster::ClusterError) -> Self {
        CoreError::TransientBackend(e.into())
    }
}

impl From<fleetctl_vpn::VpnError> for CoreError {
    fn from(e: fleetctl_vpn::VpnError) -> Self {
        CoreError::TransientBackend(e.into())
    }
}

impl From<fleetctl_stats::StatsError> for CoreError {
    fn from(e: fleetctl_stats::StatsError) -> Self {
        match e {
            fleetctl_stats::StatsError::NotRegistered(_) => CoreError::NotRegistered,
            other => CoreError::TransientBackend(other.into()),
        }
    }
}

impl From<fleetctl_estimator::EstimatorError> for CoreError {
    fn from(e: fleetctl_estimator::EstimatorError) -> Self {
        match e {
            fleetctl_estimator::EstimatorError::InvalidRange(m) => CoreError::InvalidRange(m),
            fleetctl_estimator::EstimatorError::DataCorruption(_, count, expected) => {
                CoreError::DataCorruption(count, expected)
            }
            fleetctl_estimator::EstimatorError::Stats(e) => e.into(),
        }
    }
}
