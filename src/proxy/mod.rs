//! Proxying subsystem.
//!
//! # Data Flow
//! ```text
//! route matched → service name + upstream path
//!     → forward.rs (registry lookup, circuit check)
//!     → client.rs (outbound call under the service timeout)
//!     → outcome recorded in the registry
//!     → response body read under the same deadline
//!     → response returned with the correlation header
//! ```
//!
//! # Design Decisions
//! - One base URL per service; no load balancing
//! - 4xx counts as success; timeouts, connection errors and 5xx as failures
//! - Response bodies are buffered up to the listener body limit so a
//!   downstream that stalls mid-body still times out

pub mod client;
pub mod forward;

pub use client::{build_client, HttpClient};
pub use forward::GatewayProxy;
