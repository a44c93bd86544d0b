//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (correlation ID extracted or generated)
//!     → /gateway/* → admin handlers
//!     → everything else → routing → proxy
//!     → response.rs (hop-by-hop headers stripped)
//!     → correlation ID echoed → client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{CorrelationId, X_CORRELATION_ID};
pub use server::{AppState, HttpServer};
