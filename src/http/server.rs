//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with gateway and proxy handlers
//! - Wire up middleware (tracing, body limit, correlation ID)
//! - Own the shared registry, proxy and health checker
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware,
    response::{IntoResponse, Response},
    Extension, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::admin::admin_routes;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::health::HealthChecker;
use crate::http::request::{correlation_id_middleware, CorrelationId};
use crate::proxy::{build_client, GatewayProxy};
use crate::registry::ServiceRegistry;
use crate::routing::Router as ProxyRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub proxy: GatewayProxy,
    pub routes: Arc<ProxyRouter>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<ServiceRegistry>,
    health_checker: Arc<HealthChecker>,
}

impl HttpServer {
    /// Create a server whose registry is seeded from `config.services`.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(ServiceRegistry::with_services(config.services.clone()));
        Self::with_registry(config, registry)
    }

    /// Create a server around an existing registry.
    pub fn with_registry(config: GatewayConfig, registry: Arc<ServiceRegistry>) -> Self {
        let client = build_client();
        let proxy = GatewayProxy::new(registry.clone(), client.clone())
            .with_max_response_size(config.listener.max_body_size);
        let health_checker = Arc::new(HealthChecker::from_config(
            registry.clone(),
            client,
            &config.health_check,
        ));
        let routes = Arc::new(ProxyRouter::from_config(config.routes.clone()));

        let state = AppState {
            registry: registry.clone(),
            proxy,
            routes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
            health_checker,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .merge(admin_routes())
            .fallback(proxy_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(middleware::from_fn(correlation_id_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then stop the health checker.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, services = self.registry.len(), "HTTP server starting");

        if self.config.health_check.enabled {
            self.health_checker.start();
        } else {
            tracing::info!("Active health checks disabled");
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        self.health_checker.stop().await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    pub fn health_checker(&self) -> Arc<HealthChecker> {
        self.health_checker.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Proxy handler for everything outside `/gateway/*`.
/// Resolves the route group and forwards with the prefix stripped.
async fn proxy_handler(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    request: Request,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    let Some(route) = state.routes.match_path(&path) else {
        tracing::debug!(correlation_id = %correlation_id, method = %method, path = %path, "No route matched");
        return GatewayError::NoRoute.into_response();
    };

    tracing::debug!(
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        service = %route.service,
        "Proxying request"
    );

    match state
        .proxy
        .proxy_request(route.service, request, &route.upstream_path, &correlation_id)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::info!(
                correlation_id = %correlation_id,
                service = %route.service,
                status = %e.status_code(),
                error = %e,
                "Proxy request failed"
            );
            e.into_response()
        }
    }
}
