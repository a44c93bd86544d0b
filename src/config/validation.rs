//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing services)
//! - Validate value ranges (timeouts > 0, thresholds > 0)
//! - Detect conflicting names and route prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{service}': invalid base_url '{url}'")]
    InvalidBaseUrl { service: String, url: String },

    #[error("service '{service}': unsupported scheme '{scheme}' (only http is supported)")]
    UnsupportedScheme { service: String, scheme: String },

    #[error("service '{0}': health_endpoint must start with '/'")]
    InvalidHealthEndpoint(String),

    #[error("service '{service}': {field} must be greater than zero")]
    ZeroValue { service: String, field: &'static str },

    #[error("route prefix '{0}' must start with '/' and must not end with '/'")]
    InvalidRoutePrefix(String),

    #[error("route prefix '{0}' is defined more than once")]
    DuplicateRoute(String),

    #[error("route '{prefix}' references unknown service '{service}'")]
    UnknownRouteService { prefix: String, service: String },

    #[error("health_check.{0} must be greater than zero")]
    ZeroHealthCheckValue(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut names = HashSet::new();
    for service in &config.services {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        } else if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        validate_service(service, &mut errors);
    }

    let mut prefixes = HashSet::new();
    for route in &config.routes {
        if !route.prefix.starts_with('/') || route.prefix.len() < 2 || route.prefix.ends_with('/') {
            errors.push(ValidationError::InvalidRoutePrefix(route.prefix.clone()));
        }
        if !prefixes.insert(route.prefix.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.prefix.clone()));
        }
        if !names.contains(route.service.as_str()) {
            errors.push(ValidationError::UnknownRouteService {
                prefix: route.prefix.clone(),
                service: route.service.clone(),
            });
        }
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroHealthCheckValue("interval_secs"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroHealthCheckValue("timeout_secs"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(service: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    match Url::parse(&service.base_url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::UnsupportedScheme {
            service: service.name.clone(),
            scheme: url.scheme().to_string(),
        }),
        Ok(url) if url.host_str().is_none() => errors.push(ValidationError::InvalidBaseUrl {
            service: service.name.clone(),
            url: service.base_url.clone(),
        }),
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidBaseUrl {
            service: service.name.clone(),
            url: service.base_url.clone(),
        }),
    }

    if !service.health_endpoint.starts_with('/') {
        errors.push(ValidationError::InvalidHealthEndpoint(service.name.clone()));
    }

    let zero_fields = [
        ("timeout_secs", service.timeout_secs == 0),
        ("failure_threshold", service.failure_threshold == 0),
        ("recovery_timeout_secs", service.recovery_timeout_secs == 0),
    ];
    for (field, is_zero) in zero_fields {
        if is_zero {
            errors.push(ValidationError::ZeroValue {
                service: service.name.clone(),
                field,
            });
        }
    }
}
