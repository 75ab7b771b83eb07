//! `reqwest`-backed provider transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::errors::ProviderError;
use crate::models::{HttpMethod, ProviderRequest, ProviderResponse};

use super::config::{ApiKeyPlacement, ProviderConfig};
use super::traits::ProviderTransport;

/// Connect timeout for the shared client; the per-call timeout comes from the request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport shared by every provider.
///
/// One `reqwest::Client` (and its connection pool) is reused for all calls.
/// The credential secret is attached per call according to the provider's
/// [`ApiKeyPlacement`] and never logged.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Fails only when the TLS backend can't be initialised.
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self { client })
    }

    /// Join base URL and endpoint, refusing absolute endpoints.
    fn build_url(provider: &ProviderConfig, endpoint: &str) -> Result<String, ProviderError> {
        if endpoint.contains("://") {
            return Err(ProviderError::InvalidRequest {
                provider: provider.name.clone(),
                message: format!("endpoint must be relative to the base URL: {}", endpoint),
            });
        }

        Ok(format!(
            "{}/{}",
            provider.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        ))
    }

    fn map_send_error(provider: &str, timeout: Duration, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider: provider.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if err.is_builder() {
            ProviderError::InvalidRequest {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        } else {
            ProviderError::Network {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn send(
        &self,
        provider: &ProviderConfig,
        request: &ProviderRequest,
        api_key: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let url = Self::build_url(provider, &request.endpoint)?;

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url).query(&request.params),
            HttpMethod::Post => self.client.post(&url).json(&request.params),
        };

        builder = match &provider.api_key {
            ApiKeyPlacement::Query { param } => builder.query(&[(param.as_str(), api_key)]),
            ApiKeyPlacement::Header { name } => builder.header(name.as_str(), api_key),
            ApiKeyPlacement::Bearer => builder.bearer_auth(api_key),
        };

        debug!(
            "{} request: {} {} with {} params",
            provider.name,
            request.method,
            request.endpoint,
            request.params.len()
        );

        let response = builder
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&provider.name, request.timeout, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| Self::map_send_error(&provider.name, request.timeout, e))?;

        Ok(ProviderResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_slashes() {
        let provider = ProviderConfig::new("fmp", "https://financialmodelingprep.com/api/v3/");
        assert_eq!(
            HttpTransport::build_url(&provider, "/quote/AAPL").unwrap(),
            "https://financialmodelingprep.com/api/v3/quote/AAPL"
        );
        assert_eq!(
            HttpTransport::build_url(&provider, "profile").unwrap(),
            "https://financialmodelingprep.com/api/v3/profile"
        );
    }

    #[test]
    fn test_build_url_rejects_absolute_endpoint() {
        let provider = ProviderConfig::new("fmp", "https://financialmodelingprep.com/api/v3");
        let err = HttpTransport::build_url(&provider, "https://evil.test/steal").unwrap_err();
        assert!(err.is_caller_input());
    }

    #[test]
    fn test_new_builds_client() {
        assert!(HttpTransport::new().is_ok());
    }
}
