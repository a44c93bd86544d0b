//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → GET base_url + health_endpoint for each service
//!     → registry.record_success / record_failure
//!
//! Passive health checks:
//!     Proxied request outcomes recorded by the proxy
//!     → same registry state machine
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Probes run sequentially within a tick, off the request path
//! - Probe timeout is fixed and independent of service timeouts

pub mod active;

pub use active::HealthChecker;
