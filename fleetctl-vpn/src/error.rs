use thiserror::Error;

pub type VpnResult<T> = Result<T, VpnError>;

#[derive(Debug, Error)]
pub enum VpnError {
    #[error("vpn issuer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vpn issuer returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}
