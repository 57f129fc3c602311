//! VPN/credential issuer client — the one external-service call in the
//! registration path (spec.md §1, §4.7's `mint()`, §5: "remote HTTP call
//! made during registration").
//!
//! Grounded on `environment.py::get_vpn_join_token_key`: a bearer-authed
//! `POST` carrying `{"user": "cluster-user"}`, with the minted token read
//! back from the response's `key` field. The bearer credential is the
//! `vpn-token` file from the `KUBERNETES_CONFIG` directory (spec.md §6).

pub mod error;

pub use error::{VpnError, VpnResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const VPN_USER: &str = "cluster-user";

#[async_trait]
pub trait VpnIssuer: Send + Sync {
    /// Mints a VPN join token for the caller's node.
    async fn mint(&self) -> VpnResult<String>;
}

#[derive(Debug, Serialize)]
struct MintRequest {
    user: &'static str,
}

#[derive(Debug, Deserialize)]
struct MintResponse {
    key: Option<String>,
}

/// Posts `{"user": "cluster-user"}` to the configured issuer URL with a
/// bearer `Authorization` header and expects a `{"key": "..."}` JSON body
/// back.
pub struct HttpVpnIssuer {
    client: reqwest::Client,
    issuer_url: String,
    api_key: String,
}

impl HttpVpnIssuer {
    pub fn new(issuer_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            issuer_url: issuer_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl VpnIssuer for HttpVpnIssuer {
    async fn mint(&self) -> VpnResult<String> {
        let response = self
            .client
            .post(&self.issuer_url)
            .bearer_auth(&self.api_key)
            .json(&MintRequest { user: VPN_USER })
            .send()
            .await?
            .error_for_status()?
            .json::<MintResponse>()
            .await?;
        response
            .key
            .ok_or_else(|| VpnError::UnexpectedResponse("missing key field".into()))
    }
}

/// Hands back the same pre-provisioned token on every call. Useful for
/// local/dev deployments that point `VPN_ISSUER_URL` at nothing real.
pub struct StaticVpnIssuer {
    token: String,
}

impl StaticVpnIssuer {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl VpnIssuer for StaticVpnIssuer {
    async fn mint(&self) -> VpnResult<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_issuer_returns_configured_token() {
        let issuer = StaticVpnIssuer::new("shared-token");
        assert_eq!(issuer.mint().await.unwrap(), "shared-token");
    }

    #[tokio::test]
    async fn http_issuer_parses_key_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "Bearer secret-api-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"key":"minted-abc"}"#)
            .create_async()
            .await;

        let issuer = HttpVpnIssuer::new(server.url(), "secret-api-key");
        let token = issuer.mint().await.unwrap();
        assert_eq!(token, "minted-abc");
        mock.assert_async().await;
    }
}
