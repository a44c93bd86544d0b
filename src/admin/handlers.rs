use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::registry::ServiceSummary;

#[derive(Serialize)]
pub struct GatewayHealth {
    pub status: &'static str,
    pub services: Vec<ServiceSummary>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ServiceList {
    pub services: Vec<ServiceSummary>,
}

#[derive(Serialize)]
pub struct CircuitReset {
    pub message: String,
    pub service: String,
}

/// Gateway liveness plus cached per-service state. Never probes.
pub async fn get_health(State(state): State<AppState>) -> Json<GatewayHealth> {
    Json(GatewayHealth {
        status: "healthy",
        services: state.registry.list_services(),
        timestamp: Utc::now(),
    })
}

pub async fn get_services(State(state): State<AppState>) -> Json<ServiceList> {
    Json(ServiceList {
        services: state.registry.list_services(),
    })
}

pub async fn reset_circuit(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CircuitReset>, GatewayError> {
    if !state.registry.reset_circuit(&name) {
        return Err(GatewayError::ServiceNotFound(name));
    }
    Ok(Json(CircuitReset {
        message: format!("Circuit breaker reset for service '{name}'"),
        service: name,
    }))
}
