//! Service registry and circuit-breaker state machine.
//!
//! # Responsibilities
//! - Own the map of service name → descriptor + state
//! - Apply request and probe outcomes to per-service state
//! - Answer circuit checks for the proxy
//!
//! # Design Decisions
//! - One mutex per service; outcomes for different services never contend
//! - No lock is held across an await point
//! - Unknown services are treated as unavailable by circuit checks

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::ServiceConfig;
use crate::observability::metrics;
use crate::registry::service::{ServiceState, ServiceStatus, ServiceSummary};
use crate::resilience::{CircuitPhase, CircuitState};

#[derive(Debug)]
struct ServiceEntry {
    config: ServiceConfig,
    state: Mutex<ServiceState>,
}

/// Registry of downstream services, shared via `Arc` by the router,
/// the proxy and the health checker.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: DashMap<String, Arc<ServiceEntry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry seeded with the given services.
    pub fn with_services(configs: impl IntoIterator<Item = ServiceConfig>) -> Self {
        let registry = Self::new();
        for config in configs {
            registry.register_service(config);
        }
        registry
    }

    /// Insert or replace a service. A replaced entry starts with fresh state.
    pub fn register_service(&self, config: ServiceConfig) {
        tracing::info!(
            service = %config.name,
            base_url = %config.base_url,
            failure_threshold = config.failure_threshold,
            recovery_timeout_secs = config.recovery_timeout_secs,
            "Service registered"
        );
        let name = config.name.clone();
        let entry = Arc::new(ServiceEntry {
            config,
            state: Mutex::new(ServiceState::default()),
        });
        self.services.insert(name, entry);
    }

    pub fn get_service(&self, name: &str) -> Option<ServiceConfig> {
        self.entry(name).map(|e| e.config.clone())
    }

    /// Consistent snapshot of a service's mutable state.
    pub fn service_state(&self, name: &str) -> Option<ServiceState> {
        self.entry(name).map(|e| e.state.lock().clone())
    }

    /// Summaries of all services, sorted by name.
    pub fn list_services(&self) -> Vec<ServiceSummary> {
        let entries: Vec<Arc<ServiceEntry>> = self.services.iter().map(|e| e.value().clone()).collect();
        let mut summaries: Vec<ServiceSummary> = entries
            .iter()
            .map(|e| ServiceSummary::new(&e.config, &e.state.lock()))
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Names of all registered services.
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Record a successful call or probe: closes the circuit.
    pub fn record_success(&self, name: &str) {
        let Some(entry) = self.entry(name) else {
            tracing::debug!(service = %name, "record_success for unknown service ignored");
            return;
        };

        let mut state = entry.state.lock();
        let was_open = state.circuit.is_open();
        state.status = ServiceStatus::Healthy;
        state.consecutive_failures = 0;
        state.circuit = CircuitState::Closed;
        state.last_success_time = Some(Utc::now());
        drop(state);

        if was_open {
            tracing::info!(service = %name, "Circuit closed after successful trial");
            metrics::record_circuit_state(name, false);
        }
    }

    /// Record a failed call or probe.
    pub fn record_failure(&self, name: &str) {
        let Some(entry) = self.entry(name) else {
            tracing::debug!(service = %name, "record_failure for unknown service ignored");
            return;
        };

        let threshold = entry.config.failure_threshold;
        let recovery = entry.config.recovery_timeout();

        let mut state = entry.state.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let failures = state.consecutive_failures;

        if failures < threshold {
            state.status = ServiceStatus::Degraded;
            drop(state);
            tracing::debug!(service = %name, failures, threshold, "Service degraded");
            return;
        }

        state.status = ServiceStatus::Unhealthy;
        let phase = state.circuit.phase(recovery);
        match phase {
            CircuitPhase::Closed => {
                state.circuit = CircuitState::open_now();
                drop(state);
                tracing::warn!(service = %name, failures, threshold, "Circuit opened");
                metrics::record_circuit_state(name, true);
            }
            CircuitPhase::HalfOpen => {
                state.circuit = CircuitState::open_now();
                drop(state);
                tracing::warn!(service = %name, failures, "Trial failed, circuit re-opened");
            }
            CircuitPhase::Open => {}
        }
    }

    /// Whether calls to `name` must be rejected. Unknown services are
    /// always rejected.
    pub fn is_circuit_open(&self, name: &str) -> bool {
        match self.entry(name) {
            Some(entry) => entry.state.lock().circuit.rejects(entry.config.recovery_timeout()),
            None => true,
        }
    }

    /// Derived circuit phase, `None` for unknown services.
    pub fn circuit_phase(&self, name: &str) -> Option<CircuitPhase> {
        self.entry(name)
            .map(|e| e.state.lock().circuit.phase(e.config.recovery_timeout()))
    }

    /// Administrative override: close the circuit and mark healthy.
    pub fn reset_circuit(&self, name: &str) -> bool {
        let Some(entry) = self.entry(name) else {
            return false;
        };

        let mut state = entry.state.lock();
        state.consecutive_failures = 0;
        state.circuit = CircuitState::Closed;
        state.status = ServiceStatus::Healthy;
        drop(state);

        tracing::info!(service = %name, "Circuit manually reset");
        metrics::record_circuit_state(name, false);
        true
    }

    // Clone the Arc out so the map shard lock is released before the
    // per-service mutex is taken.
    fn entry(&self, name: &str) -> Option<Arc<ServiceEntry>> {
        self.services.get(name).map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registry_with(config: ServiceConfig) -> ServiceRegistry {
        ServiceRegistry::with_services([config])
    }

    #[test]
    fn test_failures_below_threshold_degrade() {
        let registry = registry_with(ServiceConfig::new("svc", "http://127.0.0.1:1").with_failure_threshold(4));

        for n in 1..4 {
            registry.record_failure("svc");
            let state = registry.service_state("svc").unwrap();
            assert_eq!(state.consecutive_failures, n);
            assert_eq!(state.status, ServiceStatus::Degraded);
            assert!(!state.circuit_open());
            assert!(!registry.is_circuit_open("svc"));
        }

        registry.record_failure("svc");
        let state = registry.service_state("svc").unwrap();
        assert_eq!(state.status, ServiceStatus::Unhealthy);
        assert!(state.circuit_open());
        assert!(registry.is_circuit_open("svc"));
    }

    #[test]
    fn test_unknown_service_is_open() {
        let registry = ServiceRegistry::new();
        assert!(registry.is_circuit_open("never-registered"));
        assert!(registry.get_service("never-registered").is_none());
        assert!(registry.circuit_phase("never-registered").is_none());

        // Outcomes for unknown names are ignored.
        registry.record_failure("never-registered");
        registry.record_success("never-registered");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_flaky_scenario() {
        let registry = registry_with(ServiceConfig::new("flaky", "http://127.0.0.1:1").with_failure_threshold(3));

        for _ in 0..3 {
            registry.record_failure("flaky");
        }
        assert!(registry.is_circuit_open("flaky"));

        registry.record_success("flaky");
        assert!(!registry.is_circuit_open("flaky"));

        let state = registry.service_state("flaky").unwrap();
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.status, ServiceStatus::Healthy);
        assert!(!state.circuit_open());
        assert!(state.last_success_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_recovery_timeout() {
        let registry = registry_with(
            ServiceConfig::new("svc", "http://127.0.0.1:1")
                .with_failure_threshold(2)
                .with_recovery_timeout_secs(30),
        );
        registry.record_failure("svc");
        registry.record_failure("svc");
        assert!(registry.is_circuit_open("svc"));
        assert_eq!(registry.circuit_phase("svc"), Some(CircuitPhase::Open));

        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(!registry.is_circuit_open("svc"));
        assert_eq!(registry.circuit_phase("svc"), Some(CircuitPhase::HalfOpen));
        // No reset happened; state is still stored as open.
        assert!(registry.service_state("svc").unwrap().circuit_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_restarts_timer() {
        let registry = registry_with(
            ServiceConfig::new("svc", "http://127.0.0.1:1")
                .with_failure_threshold(1)
                .with_recovery_timeout_secs(10),
        );
        registry.record_failure("svc");
        let first_opened = registry.service_state("svc").unwrap().circuit.opened_at().unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!registry.is_circuit_open("svc"));

        registry.record_failure("svc");
        let state = registry.service_state("svc").unwrap();
        assert!(state.circuit.opened_at().unwrap() > first_opened);
        assert_eq!(state.status, ServiceStatus::Unhealthy);
        assert!(registry.is_circuit_open("svc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_open_keeps_timer() {
        let registry = registry_with(
            ServiceConfig::new("svc", "http://127.0.0.1:1")
                .with_failure_threshold(1)
                .with_recovery_timeout_secs(10),
        );
        registry.record_failure("svc");
        let opened = registry.service_state("svc").unwrap().circuit.opened_at();

        tokio::time::advance(Duration::from_secs(5)).await;
        registry.record_failure("svc");

        let state = registry.service_state("svc").unwrap();
        assert_eq!(state.circuit.opened_at(), opened);
        assert_eq!(state.consecutive_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_success_closes() {
        let registry = registry_with(
            ServiceConfig::new("svc", "http://127.0.0.1:1")
                .with_failure_threshold(1)
                .with_recovery_timeout_secs(5),
        );
        registry.record_failure("svc");
        tokio::time::advance(Duration::from_secs(6)).await;
        registry.record_success("svc");
        assert_eq!(registry.circuit_phase("svc"), Some(CircuitPhase::Closed));
    }

    #[test]
    fn test_register_then_list() {
        let registry = ServiceRegistry::new();
        registry.register_service(ServiceConfig::new("b", "http://127.0.0.1:2"));
        registry.register_service(ServiceConfig::new("a", "http://127.0.0.1:1"));

        let services = registry.list_services();
        let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        for summary in &services {
            assert_eq!(summary.status, ServiceStatus::Unknown);
            assert_eq!(summary.consecutive_failures, 0);
            assert!(!summary.circuit_open);
            assert_eq!(summary.circuit_state, CircuitPhase::Closed);
        }
    }

    #[test]
    fn test_reregister_overwrites() {
        let registry = ServiceRegistry::new();
        registry.register_service(ServiceConfig::new("svc", "http://127.0.0.1:1").with_failure_threshold(1));
        registry.record_failure("svc");
        assert!(registry.is_circuit_open("svc"));

        registry.register_service(ServiceConfig::new("svc", "http://127.0.0.1:2"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_service("svc").unwrap().base_url, "http://127.0.0.1:2");
        assert!(!registry.is_circuit_open("svc"));
        assert_eq!(registry.service_state("svc").unwrap().status, ServiceStatus::Unknown);
    }

    #[test]
    fn test_reset_circuit() {
        let registry = registry_with(ServiceConfig::new("svc", "http://127.0.0.1:1").with_failure_threshold(1));
        registry.record_failure("svc");
        assert!(registry.is_circuit_open("svc"));

        assert!(registry.reset_circuit("svc"));
        let state = registry.service_state("svc").unwrap();
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.status, ServiceStatus::Healthy);
        assert!(!registry.is_circuit_open("svc"));

        assert!(!registry.reset_circuit("does-not-exist"));
    }

    #[test]
    fn test_failures_isolated_per_service() {
        let registry = ServiceRegistry::with_services([
            ServiceConfig::new("bad", "http://127.0.0.1:1").with_failure_threshold(1),
            ServiceConfig::new("good", "http://127.0.0.1:2"),
        ]);
        registry.record_failure("bad");
        registry.record_success("good");

        assert!(registry.is_circuit_open("bad"));
        assert!(!registry.is_circuit_open("good"));
        assert_eq!(registry.service_state("good").unwrap().status, ServiceStatus::Healthy);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_counted_exactly() {
        let registry = Arc::new(registry_with(
            ServiceConfig::new("svc", "http://127.0.0.1:1").with_failure_threshold(50),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    registry.record_failure("svc");
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let state = registry.service_state("svc").unwrap();
        assert_eq!(state.consecutive_failures, 200);
        assert!(state.circuit_open());
        assert_eq!(state.status, ServiceStatus::Unhealthy);
    }
}
