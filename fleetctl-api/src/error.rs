//! HTTP-facing error mapping (spec.md §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<fleetctl_core::CoreError> for ApiError {
    fn from(e: fleetctl_core::CoreError) -> Self {
        use fleetctl_core::CoreError::*;
        match e {
            NotRegistered => ApiError::new(StatusCode::NOT_FOUND, e.to_string()),
            CooldownActive(_) => ApiError::new(StatusCode::TOO_MANY_REQUESTS, e.to_string()),
            InvalidRange(_) => ApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
            DataCorruption(_, _) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            TransientBackend(_) => {
                tracing::error!(error = %e, "transient backend failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "backend unavailable")
            }
        }
    }
}

impl From<fleetctl_stats::StatsError> for ApiError {
    fn from(e: fleetctl_stats::StatsError) -> Self {
        use fleetctl_stats::StatsError::*;
        match e {
            NotRegistered(_) => ApiError::new(StatusCode::NOT_FOUND, e.to_string()),
            InvalidNodeName(_) => ApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
            Database(_) => {
                tracing::error!(error = %e, "statistics store failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "backend unavailable")
            }
        }
    }
}

impl From<fleetctl_cluster::ClusterError> for ApiError {
    fn from(e: fleetctl_cluster::ClusterError) -> Self {
        tracing::error!(error = %e, "cluster adapter failure");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "backend unavailable")
    }
}

impl From<fleetctl_estimator::EstimatorError> for ApiError {
    fn from(e: fleetctl_estimator::EstimatorError) -> Self {
        use fleetctl_estimator::EstimatorError::*;
        match e {
            InvalidRange(_) => ApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
            DataCorruption(_, _, _) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Stats(inner) => inner.into(),
        }
    }
}
