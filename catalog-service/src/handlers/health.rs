//! Health check handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::repository::{Predicate, Repository};
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    fn new(state: &AppState, status: &str) -> Self {
        Self {
            status: status.to_string(),
            service: state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Liveness probe; 200 whenever the process serves requests
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::new(&state, "healthy")))
}

/// Readiness probe
///
/// Returns 503 Service Unavailable when the store cannot answer a query.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store().categories().count(&Predicate::all()).await {
        Ok(_) => (StatusCode::OK, Json(HealthResponse::new(&state, "ready"))),
        Err(e) => {
            tracing::error!("Store readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new(&state, "unavailable")),
            )
        }
    }
}
