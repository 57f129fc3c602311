//! The seven endpoints of spec.md §6 plus `/healthz`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fleetctl_types::NodeDetails;
use serde::{Deserialize, Serialize};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/node_token", post(node_token))
        .route("/api/v1/node_keepalive/{node_id}", put(node_keepalive))
        .route(
            "/api/v1/node_exists/{name}",
            get(node_exists).post(graceful_shutdown),
        )
        .route("/api/v1/cluster_access", get(cluster_access))
        .route(
            "/api/v1/node_survival_chance/{name}/{minutes}",
            get(node_survival_chance),
        )
        .route("/api/v1/abrupt_disconnects/{name}", get(abrupt_disconnects))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct NodeTokenRequest {
    name: String,
    id: String,
}

#[derive(Debug, Serialize)]
struct NodeTokenResponse {
    k8s_ip: String,
    k8s_port: u16,
    k8s_token: String,
    vpn_ip: String,
    vpn_port: u16,
    vpn_token: String,
}

async fn node_token(
    State(state): State<AppState>,
    Json(req): Json<NodeTokenRequest>,
) -> Result<Json<NodeTokenResponse>, ApiError> {
    let details = state
        .registrar
        .register(&NodeDetails::new(req.name, req.id))
        .await?;
    Ok(Json(NodeTokenResponse {
        k8s_ip: details.k8s_ip,
        k8s_port: details.k8s_port,
        k8s_token: details.k8s_token,
        vpn_ip: details.vpn_ip,
        vpn_port: details.vpn_port,
        vpn_token: details.vpn_token,
    }))
}

async fn node_keepalive(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.keepalive.pulse(&node_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct NodeExistsResponse {
    exists: bool,
}

async fn node_exists(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<NodeExistsResponse>, ApiError> {
    let exists = state.stats.node_registered(&name).await?;
    Ok(Json(NodeExistsResponse { exists }))
}

async fn graceful_shutdown(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.shutdown.graceful_shutdown(&name).await?;
    Ok(axum::http::StatusCode::ACCEPTED)
}

async fn cluster_access(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let yaml = state.cluster.read_kubeconfig().await?;
    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/yaml")],
        yaml,
    ))
}

#[derive(Debug, Serialize)]
struct SurvivalResponse {
    survival_chance: f64,
}

async fn node_survival_chance(
    State(state): State<AppState>,
    Path((name, minutes)): Path<(String, u32)>,
) -> Result<Json<SurvivalResponse>, ApiError> {
    if let Some(cached) = state.cached_survival(&name, minutes) {
        return Ok(Json(SurvivalResponse {
            survival_chance: cached,
        }));
    }
    let now = chrono::Utc::now();
    let p = state.estimator.survival_chance(&name, minutes, now).await?;
    state.cache_survival(&name, minutes, p);
    Ok(Json(SurvivalResponse { survival_chance: p }))
}

#[derive(Debug, Serialize)]
struct DisconnectScoreResponse {
    score: f64,
}

/// `d` abrupt disconnects against a node whose age is `age_seconds`: once
/// the disconnect count alone (at one per hour) would exceed the node's
/// entire age, the node's reliability score floors at zero. Otherwise the
/// score decays linearly with disconnects per second of age (spec.md
/// §4.11).
async fn abrupt_disconnects(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DisconnectScoreResponse>, ApiError> {
    if let Some(cached) = state.cached_disconnect_score(&name) {
        return Ok(Json(DisconnectScoreResponse { score: cached }));
    }

    let disconnects = state.stats.get_abrupt_disconnect_count(&name).await?;
    let registration_time = state.stats.get_registration_time(&name).await?;
    let age_seconds = (chrono::Utc::now() - registration_time)
        .num_seconds()
        .max(1) as f64;

    let disconnect_seconds = disconnects as f64 * 3600.0;
    let score = if disconnect_seconds >= age_seconds {
        0.0
    } else {
        (1.0 - disconnect_seconds / age_seconds).max(0.0)
    };

    state.cache_disconnect_score(&name, score);
    Ok(Json(DisconnectScoreResponse { score }))
}
