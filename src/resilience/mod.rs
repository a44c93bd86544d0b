//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to a downstream service:
//!     → circuit_breaker.rs (reject fast while the circuit is open)
//!     → timeouts.rs (enforce the per-service deadline)
//!     → outcome recorded in the service registry
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a failed call is recorded and surfaced immediately
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{CircuitPhase, CircuitState};
pub use timeouts::{with_timeout, TimedOut};
