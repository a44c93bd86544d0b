//! Shared utilities for integration tests: mock downstream services and
//! helpers for driving the gateway router in-process.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::config::{GatewayConfig, ServiceConfig};
use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// A running mock downstream service.
pub struct MockService {
    pub addr: SocketAddr,
    /// Non-health-check requests received.
    pub calls: Arc<AtomicU32>,
}

impl MockService {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Serve `app` on an ephemeral local port.
pub async fn spawn_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Backend that answers `/ping` and echoes every other request as JSON.
pub async fn start_echo_backend() -> MockService {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let app = Router::new()
        .route("/ping", get(|| async { "pong" }))
        .fallback(move |req: Request| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            echo(req).await
        });
    MockService {
        addr: spawn_backend(app).await,
        calls,
    }
}

async fn echo(req: Request) -> Json<Value> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "correlation_id": parts.headers.get("x-correlation-id").and_then(|v| v.to_str().ok()),
        "body": String::from_utf8_lossy(&bytes),
    }))
}

/// Backend that answers every path, `/ping` included, with `status`.
pub async fn start_status_backend(status: u16) -> MockService {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let code = StatusCode::from_u16(status).unwrap();
    let app = Router::new()
        .route("/ping", get(move || async move { code }))
        .fallback(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (code, "upstream body with internal details")
        });
    MockService {
        addr: spawn_backend(app).await,
        calls,
    }
}

/// Backend that waits `delay` before answering 200.
pub async fn start_slow_backend(delay: Duration) -> MockService {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let app = Router::new().fallback(move || async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        "slow"
    });
    MockService {
        addr: spawn_backend(app).await,
        calls,
    }
}

/// Raw TCP downstream that sends a 200 status line, headers and part of the
/// body, then holds the connection open without finishing.
pub async fn start_stalling_backend() -> MockService {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 10\r\n\r\nabc")
                    .await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    MockService { addr, calls }
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Default routes, the given services, background checks off.
pub fn test_config(services: Vec<ServiceConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.services = services;
    config.health_check.enabled = false;
    config
}

/// Drive the router in-process.
pub async fn send(router: &Router, request: axum::http::Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

pub fn json_body(bytes: &Bytes) -> Value {
    serde_json::from_slice(bytes).unwrap()
}
