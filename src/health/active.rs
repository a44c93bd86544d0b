//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered service's health endpoint
//! - Feed results into the registry's circuit-breaker state machine

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{HealthCheckConfig, ServiceConfig};
use crate::observability::metrics;
use crate::proxy::HttpClient;
use crate::registry::ServiceRegistry;
use crate::resilience::with_timeout;

const USER_AGENT: &str = "api-gateway-health-check";

/// Health bodies are small; anything larger is left unread.
const PROBE_BODY_LIMIT: usize = 64 * 1024;

/// Probes services and records outcomes. Cheap to clone into the loop task.
#[derive(Clone)]
struct Prober {
    registry: Arc<ServiceRegistry>,
    client: HttpClient,
    probe_timeout: Duration,
}

impl Prober {
    async fn check_all(&self) {
        let names = self.registry.service_names();
        tracing::debug!(services = names.len(), "Running health checks");

        for name in names {
            // Re-read each time: a service may have been re-registered mid-tick.
            let Some(service) = self.registry.get_service(&name) else {
                continue;
            };
            let healthy = self.probe(&service).await;
            if healthy {
                self.registry.record_success(&name);
            } else {
                self.registry.record_failure(&name);
            }
            metrics::record_health_check(&name, healthy);
        }
    }

    async fn probe(&self, service: &ServiceConfig) -> bool {
        let url = service.health_url();
        let uri: Uri = match url.parse() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(service = %service.name, url = %url, error = %e, "Invalid health check URL");
                return false;
            }
        };

        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(service = %service.name, error = %e, "Failed to build health check request");
                return false;
            }
        };

        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            // Drain so the connection goes back to the pool.
            let drained = axum::body::to_bytes(Body::new(response.into_body()), PROBE_BODY_LIMIT)
                .await
                .is_ok();
            Ok::<_, hyper_util::client::legacy::Error>((status, drained))
        };

        match with_timeout(self.probe_timeout, exchange).await {
            Ok(Ok((status, drained))) => {
                let success = status.is_success();
                if !success {
                    tracing::warn!(service = %service.name, status = %status, "Health check failed: non-success status");
                } else if !drained {
                    tracing::debug!(service = %service.name, "Health check body not fully read");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(service = %service.name, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(service = %service.name, timeout = ?self.probe_timeout, "Health check failed: timeout");
                false
            }
        }
    }
}

struct RunningLoop {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Background task that probes every registered service on a fixed period.
pub struct HealthChecker {
    prober: Prober,
    interval: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl HealthChecker {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        client: HttpClient,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            prober: Prober {
                registry,
                client,
                probe_timeout,
            },
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn from_config(registry: Arc<ServiceRegistry>, client: HttpClient, config: &HealthCheckConfig) -> Self {
        Self::new(
            registry,
            client,
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Spawn the check loop. No-op if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            tracing::debug!("Health checker already running");
            return;
        }

        tracing::info!(
            interval = ?self.interval,
            probe_timeout = ?self.prober.probe_timeout,
            "Health checker starting"
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(self.prober.clone(), self.interval, stop_rx));
        *running = Some(RunningLoop { stop_tx, handle });
    }

    /// Stop the loop and wait for it to exit. An in-flight tick completes
    /// before this returns.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(RunningLoop { stop_tx, handle }) = running else {
            return;
        };

        let _ = stop_tx.send(());
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Health checker task failed");
        }
        tracing::info!("Health checker stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Run one round of probes immediately.
    pub async fn check_all(&self) {
        self.prober.check_all().await;
    }
}

async fn run_loop(prober: Prober, interval: Duration, mut stop_rx: oneshot::Receiver<()>) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                prober.check_all().await;
            }
            _ = &mut stop_rx => {
                tracing::debug!("Health checker received stop signal, exiting loop");
                break;
            }
        }
    }
}
