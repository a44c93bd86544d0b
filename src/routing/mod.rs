//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route group lookup)
//!     → matcher.rs (prefix match, prefix strip)
//!     → Return: service name + upstream path, or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by prefix length
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Route groups are data, not code: adding a service is a config change
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{Route, RouteMatch, Router};
