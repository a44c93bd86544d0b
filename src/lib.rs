//! API gateway library: service registry with circuit breakers, background
//! health checks and correlation-id-aware reverse proxying.

pub mod admin;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod registry;
pub mod resilience;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use health::HealthChecker;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::GatewayProxy;
pub use registry::ServiceRegistry;
