//! Lazily-populated map of circuit breakers, one per service name.

use std::sync::Arc;

use dashmap::DashMap;
use log::info;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitState};

/// Owns every circuit breaker of the process.
///
/// Breakers are created on first use of a service name and live until the
/// registry is dropped. Lookups and insertions lock a single map shard, so
/// unrelated services never contend on one lock.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    overrides: DashMap<String, CircuitBreakerConfig>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::with_default_config(CircuitBreakerConfig::default())
    }

    pub fn with_default_config(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            overrides: DashMap::new(),
            default_config,
        }
    }

    /// Configure a specific service.
    ///
    /// An existing breaker for the service is replaced, so its state resets.
    pub fn configure(&self, service: &str, config: CircuitBreakerConfig) {
        self.overrides.insert(service.to_string(), config);
        self.breakers.remove(service);
    }

    /// Get the breaker for `service`, creating it on first use.
    pub fn get(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(service) {
            return Arc::clone(existing.value());
        }

        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                let config = self
                    .overrides
                    .get(service)
                    .map(|c| c.value().clone())
                    .unwrap_or_else(|| self.default_config.clone());
                Arc::new(CircuitBreaker::with_config(service, config))
            })
            .value()
            .clone()
    }

    /// State of a service's breaker; services never called are Closed.
    pub fn state(&self, service: &str) -> CircuitState {
        self.breakers
            .get(service)
            .map(|b| b.state())
            .unwrap_or(CircuitState::Closed)
    }

    pub fn reset(&self, service: &str) {
        if let Some(breaker) = self.breakers.get(service) {
            breaker.reset();
        }
    }

    /// Drop every breaker; they are recreated Closed on next use.
    pub fn reset_all(&self) {
        self.breakers.clear();
        info!("Circuit breaker registry: all circuits reset");
    }

    /// Metrics for all breakers created so far.
    pub fn metrics(&self) -> Vec<CircuitMetrics> {
        let mut metrics: Vec<CircuitMetrics> =
            self.breakers.iter().map(|entry| entry.metrics()).collect();
        metrics.sort_by(|a, b| a.service.cmp(&b.service));
        metrics
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_same_name_returns_same_instance() {
        let registry = CircuitBreakerRegistry::new();

        let first = registry.get("singleton_test");
        let second = registry.get("singleton_test");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_different_names_create_different_instances() {
        let registry = CircuitBreakerRegistry::new();

        let first = registry.get("breaker1");
        let second = registry.get("breaker2");
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_service_isolation() {
        let registry = CircuitBreakerRegistry::with_default_config(CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });

        registry.get("provider_a").record_failure();
        assert_eq!(registry.state("provider_a"), CircuitState::Open);
        assert_eq!(registry.state("provider_b"), CircuitState::Closed);
        assert!(registry.get("provider_b").is_allowed());
    }

    #[test]
    fn test_configure_overrides_default_and_resets_state() {
        let registry = CircuitBreakerRegistry::with_default_config(CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });
        registry.get("fmp").record_failure();
        assert_eq!(registry.state("fmp"), CircuitState::Open);

        registry.configure(
            "fmp",
            CircuitBreakerConfig {
                failure_threshold: 10,
                timeout: Duration::from_secs(5),
                half_open_max_calls: 1,
            },
        );

        let breaker = registry.get("fmp");
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.config().failure_threshold, 10);
    }

    #[test]
    fn test_metrics_sorted_by_service() {
        let registry = CircuitBreakerRegistry::new();
        registry.get("metric_b").record_failure();
        registry.get("metric_a").record_failure();
        registry.get("metric_a").record_failure();

        let metrics = registry.metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].service, "metric_a");
        assert_eq!(metrics[0].failure_count, 2);
        assert_eq!(metrics[1].failure_count, 1);
    }

    #[test]
    fn test_reset_all_clears_breakers() {
        let registry = CircuitBreakerRegistry::with_default_config(CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });
        registry.get("a").record_failure();
        registry.reset_all();
        assert!(registry.metrics().is_empty());
        assert_eq!(registry.state("a"), CircuitState::Closed);
    }
}
