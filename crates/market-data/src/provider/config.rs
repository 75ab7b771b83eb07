//! Provider registry entries as supplied by configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::registry::CircuitBreakerConfig;

/// Default timeout for a provider call when the caller doesn't pass one.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the credential secret goes on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiKeyPlacement {
    /// `?{param}={secret}` (Alpha Vantage, FMP, Polygon).
    Query { param: String },
    /// `{name}: {secret}` (Finnhub's `X-Finnhub-Token`).
    Header { name: String },
    /// `Authorization: Bearer {secret}`.
    Bearer,
}

impl Default for ApiKeyPlacement {
    fn default() -> Self {
        Self::Query {
            param: "apikey".to_string(),
        }
    }
}

/// A configured external data provider.
///
/// ```
/// use keyrelay_market_data::provider::ProviderConfig;
///
/// let config: ProviderConfig = serde_json::from_str(r#"{
///     "name": "finnhub",
///     "base_url": "https://finnhub.io/api/v1",
///     "api_key": { "type": "header", "name": "X-Finnhub-Token" }
/// }"#).unwrap();
/// assert_eq!(config.default_timeout().as_secs(), 30);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name; credentials reference it.
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: ApiKeyPlacement,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Breaker overrides for this provider; registry defaults otherwise.
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    /// Substrings that mark a rate-limited response body.
    #[serde(default)]
    pub rate_limit_patterns: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: ApiKeyPlacement::default(),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            circuit_breaker: None,
            rate_limit_patterns: Vec::new(),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}
