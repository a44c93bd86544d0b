//! Per-service health and circuit state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::resilience::{CircuitPhase, CircuitState};

/// Health status of a downstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unhealthy,
    #[default]
    Unknown,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Unhealthy => "unhealthy",
            ServiceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Mutable state of one service. Only the registry mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceState {
    pub status: ServiceStatus,
    pub consecutive_failures: u32,
    pub circuit: CircuitState,
    pub last_success_time: Option<DateTime<Utc>>,
}

impl ServiceState {
    pub fn circuit_open(&self) -> bool {
        self.circuit.is_open()
    }
}

/// Introspection view of a registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub status: ServiceStatus,
    pub circuit_open: bool,
    pub circuit_state: CircuitPhase,
    pub consecutive_failures: u32,
    pub base_url: String,
    pub last_success_time: Option<DateTime<Utc>>,
}

impl ServiceSummary {
    pub(crate) fn new(config: &ServiceConfig, state: &ServiceState) -> Self {
        Self {
            name: config.name.clone(),
            status: state.status,
            circuit_open: state.circuit_open(),
            circuit_state: state.circuit.phase(config.recovery_timeout()),
            consecutive_failures: state.consecutive_failures,
            base_url: config.base_url.clone(),
            last_success_time: state.last_success_time,
        }
    }
}
