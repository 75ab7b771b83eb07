//! Registry of configured providers and their rate-limit hooks.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::info;

use super::breaker_registry::CircuitBreakerRegistry;
use crate::provider::{
    PatternSignal, ProviderConfig, RateLimitSignalExtractor, StatusCodeSignal,
};

/// A provider plus the hook that recognises its rate-limit responses.
#[derive(Clone)]
pub struct ProviderEntry {
    pub config: ProviderConfig,
    pub signal: Arc<dyn RateLimitSignalExtractor>,
}

impl ProviderEntry {
    /// Entry whose signal hook is derived from the config: body patterns
    /// when any are configured, plain HTTP 429 otherwise.
    pub fn from_config(config: ProviderConfig) -> Self {
        let signal: Arc<dyn RateLimitSignalExtractor> = if config.rate_limit_patterns.is_empty() {
            Arc::new(StatusCodeSignal)
        } else {
            Arc::new(PatternSignal::new(config.rate_limit_patterns.clone()))
        };

        Self { config, signal }
    }

    pub fn with_signal(mut self, signal: Arc<dyn RateLimitSignalExtractor>) -> Self {
        self.signal = signal;
        self
    }
}

/// Lookup table from provider name to [`ProviderEntry`].
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry.register(ProviderEntry::from_config(config));
        }
        registry
    }

    /// Add or replace a provider.
    pub fn register(&mut self, entry: ProviderEntry) {
        info!("Registered provider '{}' at {}", entry.config.name, entry.config.base_url);
        self.providers.insert(entry.config.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&ProviderEntry> {
        self.providers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Provider names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Push per-provider breaker overrides into `breakers`.
    pub fn configure_breakers(&self, breakers: &CircuitBreakerRegistry) {
        for entry in self.providers.values() {
            if let Some(config) = &entry.config.circuit_breaker {
                breakers.configure(&entry.config.name, config.clone());
            }
        }
    }
}
