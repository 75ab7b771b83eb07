//! Request and configuration models of the orchestrator.

use std::collections::BTreeMap;
use std::time::Duration;

use keyrelay_market_data::{CircuitState, HttpMethod};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_RETRIES};
use crate::credentials::KeyHealthReport;

/// Linear backoff between retries: `base * attempt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub base_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

impl BackoffPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_ms.saturating_mul(u64::from(attempt)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub default_max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// One logical call to a provider, possibly spanning several attempts.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub provider: String,
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
    pub method: HttpMethod,
    /// Attempts allowed; `None` uses the orchestrator default.
    pub max_retries: Option<u32>,
    /// Per-attempt timeout; `None` uses the provider's default.
    pub timeout: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl ExecuteRequest {
    pub fn new(provider: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
            method: HttpMethod::Get,
            max_retries: None,
            timeout: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Key health plus breaker state of one provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub provider: String,
    pub circuit_state: CircuitState,
    pub circuit_failure_count: u32,
    pub keys: KeyHealthReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_linear() {
        let backoff = BackoffPolicy { base_ms: 250 };
        assert_eq!(backoff.delay(1), Duration::from_millis(250));
        assert_eq!(backoff.delay(3), Duration::from_millis(750));
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_max_retries, 3);
        assert_eq!(config.backoff.base_ms, 1000);
    }
}
