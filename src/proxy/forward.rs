//! Request forwarding with circuit-breaker and timeout policy.
//!
//! The service timeout covers the whole exchange: response headers and the
//! complete response body must arrive before the deadline, otherwise the
//! call is a timeout and counts against the circuit.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode, Uri},
    response::Response,
};
use hyper::body::Incoming;

use crate::config::ServiceConfig;
use crate::error::GatewayError;
use crate::http::request::CorrelationId;
use crate::http::response::{prepare_upstream_headers, strip_hop_by_hop};
use crate::observability::metrics;
use crate::proxy::client::HttpClient;
use crate::registry::ServiceRegistry;
use crate::resilience::with_timeout;

/// Upper bound on a buffered upstream response body.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Forwards requests to registered services and reports outcomes
/// back to the registry.
#[derive(Clone)]
pub struct GatewayProxy {
    registry: Arc<ServiceRegistry>,
    client: HttpClient,
    max_response_size: usize,
}

enum Outcome {
    Complete(axum::http::response::Parts, Bytes),
    ServerError(StatusCode),
    Connection(String),
    Timeout,
}

impl GatewayProxy {
    pub fn new(registry: Arc<ServiceRegistry>, client: HttpClient) -> Self {
        Self {
            registry,
            client,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    pub fn with_max_response_size(mut self, limit: usize) -> Self {
        self.max_response_size = limit;
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Forward `request` to `service_name` at `path`.
    ///
    /// `path` replaces the inbound path; the inbound query string is kept.
    /// Dropping the returned future cancels the outbound call.
    pub async fn proxy_request(
        &self,
        service_name: &str,
        request: Request<Body>,
        path: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Response, GatewayError> {
        let service = self
            .registry
            .get_service(service_name)
            .ok_or_else(|| GatewayError::UnknownService(service_name.to_string()))?;

        if self.registry.is_circuit_open(service_name) {
            tracing::warn!(
                correlation_id = %correlation_id,
                service = %service_name,
                "Circuit open, rejecting request"
            );
            metrics::record_circuit_rejection(service_name);
            return Err(GatewayError::CircuitOpen(service_name.to_string()));
        }

        let upstream = build_upstream_request(&service, request, path, correlation_id)?;
        let method = upstream.method().clone();
        let start = Instant::now();

        tracing::debug!(
            correlation_id = %correlation_id,
            service = %service_name,
            method = %method,
            uri = %upstream.uri(),
            "Forwarding request"
        );

        let exchange = self.exchange(upstream);
        let outcome = with_timeout(service.timeout(), exchange)
            .await
            .unwrap_or(Outcome::Timeout);

        match outcome {
            Outcome::Complete(mut parts, body) => {
                metrics::record_request(service_name, parts.status.as_u16(), start);
                // 4xx means the service is up; the request itself was bad.
                self.registry.record_success(service_name);

                strip_hop_by_hop(&mut parts.headers);
                correlation_id.apply(&mut parts.headers);
                Ok(Response::from_parts(parts, Body::from(body)))
            }
            Outcome::ServerError(status) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    service = %service_name,
                    status = %status,
                    "Upstream returned server error"
                );
                metrics::record_request(service_name, status.as_u16(), start);
                self.registry.record_failure(service_name);
                Err(GatewayError::UpstreamStatus {
                    service: service_name.to_string(),
                    status,
                })
            }
            Outcome::Connection(error) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    service = %service_name,
                    error = %error,
                    "Upstream connection failed"
                );
                metrics::record_request(service_name, StatusCode::BAD_GATEWAY.as_u16(), start);
                self.registry.record_failure(service_name);
                Err(GatewayError::UpstreamConnection(service_name.to_string()))
            }
            Outcome::Timeout => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    service = %service_name,
                    timeout = ?service.timeout(),
                    "Upstream request timed out"
                );
                metrics::record_request(service_name, StatusCode::GATEWAY_TIMEOUT.as_u16(), start);
                self.registry.record_failure(service_name);
                Err(GatewayError::UpstreamTimeout(service_name.to_string()))
            }
        }
    }

    /// Send the request and read the full response body.
    async fn exchange(&self, upstream: Request<Body>) -> Outcome {
        let response = match self.client.request(upstream).await {
            Ok(response) => response,
            Err(e) => return Outcome::Connection(e.to_string()),
        };

        let (parts, body) = response.into_parts();
        if parts.status.is_server_error() {
            return Outcome::ServerError(parts.status);
        }

        match read_body(body, self.max_response_size).await {
            Ok(bytes) => Outcome::Complete(parts, bytes),
            Err(e) => Outcome::Connection(e.to_string()),
        }
    }
}

async fn read_body(body: Incoming, limit: usize) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(Body::new(body), limit).await
}

/// Rewrite an inbound request for `service`: new origin and path, inbound
/// query, method and body kept, hop-by-hop headers dropped.
fn build_upstream_request(
    service: &ServiceConfig,
    request: Request<Body>,
    path: &str,
    correlation_id: &CorrelationId,
) -> Result<Request<Body>, GatewayError> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let uri: Uri = service.upstream_url(&path_and_query).parse().map_err(|e| {
        tracing::error!(service = %service.name, error = %e, "Invalid upstream URI");
        GatewayError::InvalidUpstreamUri(service.name.clone())
    })?;

    prepare_upstream_headers(&mut parts.headers);
    correlation_id.apply(&mut parts.headers);

    let mut builder = Request::builder().method(parts.method).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        *headers = parts.headers;
    }
    builder.body(body).map_err(|e| {
        tracing::error!(service = %service.name, error = %e, "Failed to build upstream request");
        GatewayError::InvalidUpstreamUri(service.name.clone())
    })
}
