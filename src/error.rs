//! Gateway error taxonomy.
//!
//! Every variant maps to a stable status code and a short client-facing
//! message. Upstream bodies, addresses and error chains only reach the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("service '{0}' is not registered")]
    UnknownService(String),

    #[error("circuit open for service '{0}'")]
    CircuitOpen(String),

    #[error("service '{0}' timed out")]
    UpstreamTimeout(String),

    #[error("service '{0}' is unreachable")]
    UpstreamConnection(String),

    #[error("service '{service}' returned {status}")]
    UpstreamStatus { service: String, status: StatusCode },

    #[error("invalid upstream uri for service '{0}'")]
    InvalidUpstreamUri(String),

    #[error("no route matches the request path")]
    NoRoute,

    #[error("service '{0}' not found")]
    ServiceNotFound(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownService(_) => StatusCode::BAD_GATEWAY,
            GatewayError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamConnection(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamStatus { status, .. } => *status,
            GatewayError::InvalidUpstreamUri(_) => StatusCode::BAD_GATEWAY,
            GatewayError::NoRoute => StatusCode::NOT_FOUND,
            GatewayError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::UnknownService(_) => "unknown_service",
            GatewayError::CircuitOpen(_) => "circuit_open",
            GatewayError::UpstreamTimeout(_) => "upstream_timeout",
            GatewayError::UpstreamConnection(_) => "upstream_unavailable",
            GatewayError::UpstreamStatus { .. } => "upstream_error",
            GatewayError::InvalidUpstreamUri(_) => "bad_gateway",
            GatewayError::NoRoute => "not_found",
            GatewayError::ServiceNotFound(_) => "not_found",
        }
    }

    fn client_message(&self) -> String {
        match self {
            GatewayError::UnknownService(name) => format!("Service '{name}' is not available"),
            GatewayError::CircuitOpen(name) => {
                format!("Service '{name}' is temporarily unavailable")
            }
            GatewayError::UpstreamTimeout(name) => format!("Service '{name}' did not respond in time"),
            GatewayError::UpstreamConnection(name) => format!("Service '{name}' is unreachable"),
            GatewayError::UpstreamStatus { service, .. } => {
                format!("Service '{service}' failed to process the request")
            }
            GatewayError::InvalidUpstreamUri(_) => "Bad gateway".to_string(),
            GatewayError::NoRoute => "No route matches the request path".to_string(),
            GatewayError::ServiceNotFound(name) => format!("Service '{name}' not found"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code(),
            message: self.client_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::UnknownService("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(GatewayError::CircuitOpen("x".into()).status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(GatewayError::UpstreamTimeout("x".into()).status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(GatewayError::UpstreamConnection("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            GatewayError::UpstreamStatus {
                service: "x".into(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(GatewayError::NoRoute.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::ServiceNotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_body_is_short_json() {
        let response = GatewayError::CircuitOpen("backend".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "circuit_open");
        assert_eq!(json["message"], "Service 'backend' is temporarily unavailable");
    }
}
