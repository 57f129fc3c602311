//! Configuration loading (spec.md §6 "Environment / config").
//!
//! Everything the core needs to start is either an environment variable
//! or a file inside the directory named by `KUBERNETES_CONFIG`:
//!
//! - `REDIS_IP`, `REDIS_PASSWORD` — the shared KV store.
//! - `POSTGRES_HOST`, `POSTGRES_USER`, `POSTGRES_PASSWORD` — the shared
//!   relational store (host/user/password come from "the configuration
//!   layer" per spec.md §6; this is that layer).
//! - `KUBERNETES_CONFIG` — a directory containing `host-source-dns-name`,
//!   `vpn-token`, `kubernetes-config-file` (base64-encoded kubeconfig),
//!   and `k3s-node-token`.
//! - `BIND_ADDRESS` (optional, defaults to `0.0.0.0:8080`) — the HTTP
//!   surface's listen address.
//! - `VPN_ISSUER_URL` (optional) — where the VPN token mint call is sent.
//!
//! An optional TOML file can be layered underneath the environment via
//! `FleetConfig::load_with_file`, following the same builder pattern the
//! teacher's `config` crate usage elsewhere in the pack establishes
//! (`OnSocial-Labs-onsocial-protocol`'s relayer also depends on `config`).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to read kubernetes config directory file {path}: {source}")]
    ReadKubeFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kubernetes-config-file contents are not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("kubernetes-config-file contents are not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Raw settings as they come off the environment/TOML layer, before the
/// `KUBERNETES_CONFIG` directory has been read.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSettings {
    pub redis_ip: String,
    #[serde(default)]
    pub redis_password: Option<String>,
    pub postgres_host: String,
    pub postgres_user: String,
    pub postgres_password: String,
    pub kubernetes_config: PathBuf,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_vpn_issuer_url")]
    pub vpn_issuer_url: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_vpn_issuer_url() -> String {
    "https://httpbin.org/post".to_string()
}

/// Fully resolved configuration, including the contents of the
/// `KUBERNETES_CONFIG` directory.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub redis_ip: String,
    pub redis_password: Option<String>,
    pub postgres_host: String,
    pub postgres_user: String,
    pub postgres_password: String,
    pub bind_address: String,
    pub vpn_issuer_url: String,
    pub cluster_host: String,
    pub vpn_token: String,
    pub kubeconfig_yaml: String,
    pub k3s_node_token: String,
}

impl FleetConfig {
    /// Load from the process environment only.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(None)
    }

    /// Load from the process environment, layered over an optional TOML
    /// file (the file provides defaults; environment variables win).
    pub fn load_with_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(Some(path.as_ref()))
    }

    fn build(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let raw: RawSettings = builder
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        let kube_dir = &raw.kubernetes_config;
        let cluster_host = read_kube_file(kube_dir, "host-source-dns-name")?;
        let vpn_token = read_kube_file(kube_dir, "vpn-token")?;
        let k3s_node_token = read_kube_file(kube_dir, "k3s-node-token")?;
        let kubeconfig_b64 = read_kube_file(kube_dir, "kubernetes-config-file")?;
        let kubeconfig_yaml = decode_base64_utf8(&kubeconfig_b64)?;

        Ok(Self {
            redis_ip: raw.redis_ip,
            redis_password: raw.redis_password,
            postgres_host: raw.postgres_host,
            postgres_user: raw.postgres_user,
            postgres_password: raw.postgres_password,
            bind_address: raw.bind_address,
            vpn_issuer_url: raw.vpn_issuer_url,
            cluster_host,
            vpn_token,
            kubeconfig_yaml,
            k3s_node_token,
        })
    }
}

fn read_kube_file(dir: &Path, filename: &str) -> Result<String, ConfigError> {
    let path = dir.join(filename);
    std::fs::read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ConfigError::ReadKubeFile { path, source })
}

fn decode_base64_utf8(input: &str) -> Result<String, ConfigError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD.decode(input)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_kube_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("host-source-dns-name", "cluster.example.com".to_string()),
            ("vpn-token", "vpn-secret".to_string()),
            ("k3s-node-token", "node-secret".to_string()),
            (
                "kubernetes-config-file",
                {
                    use base64::Engine;
                    base64::engine::general_purpose::STANDARD.encode("apiVersion: v1\n")
                },
            ),
        ];
        for (name, contents) in files {
            let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
            f.write_all(contents.as_bytes()).unwrap();
        }
        dir
    }

    #[test]
    fn loads_and_decodes_kubeconfig() {
        let kube_dir = write_kube_dir();
        std::env::set_var("REDIS_IP", "127.0.0.1");
        std::env::set_var("POSTGRES_HOST", "localhost");
        std::env::set_var("POSTGRES_USER", "fleet");
        std::env::set_var("POSTGRES_PASSWORD", "secret");
        std::env::set_var("KUBERNETES_CONFIG", kube_dir.path());

        let cfg = FleetConfig::load().unwrap();
        assert_eq!(cfg.cluster_host, "cluster.example.com");
        assert_eq!(cfg.kubeconfig_yaml, "apiVersion: v1\n");
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");

        std::env::remove_var("REDIS_IP");
        std::env::remove_var("POSTGRES_HOST");
        std::env::remove_var("POSTGRES_USER");
        std::env::remove_var("POSTGRES_PASSWORD");
        std::env::remove_var("KUBERNETES_CONFIG");
    }
}
