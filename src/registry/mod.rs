//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     GatewayConfig.services → ServiceRegistry::register_service
//!
//! Runtime:
//!     proxy outcome ──┐
//!                     ├→ record_success / record_failure → ServiceState
//!     health probe ───┘
//!     proxy → is_circuit_open → reject or forward
//!     admin → list_services / reset_circuit
//! ```
//!
//! # Design Decisions
//! - Single source of truth per service for proxy and probe outcomes
//! - Descriptor (ServiceConfig) is plain data; behavior is config-driven
//! - State resets to Unknown/Closed on restart (nothing is persisted)

pub mod manager;
pub mod service;

pub use manager::ServiceRegistry;
pub use service::{ServiceState, ServiceStatus, ServiceSummary};
