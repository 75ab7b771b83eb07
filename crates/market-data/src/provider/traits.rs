//! Seams between the orchestrator and the outside world.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::{ProviderRequest, ProviderResponse};

use super::config::ProviderConfig;

/// Sends one request to a provider with one credential.
///
/// Implementations return `Ok` for every HTTP response that arrived,
/// whatever its status: the rate-limit hook needs to see 429s and
/// quota-exceeded bodies before they are turned into errors. `Err` is
/// reserved for calls that produced no response (timeout, connection
/// failure, unbuildable request).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use keyrelay_market_data::provider::{ProviderConfig, ProviderTransport};
///
/// struct CannedTransport;
///
/// #[async_trait]
/// impl ProviderTransport for CannedTransport {
///     async fn send(
///         &self,
///         provider: &ProviderConfig,
///         request: &ProviderRequest,
///         api_key: &str,
///     ) -> Result<ProviderResponse, ProviderError> {
///         Ok(ProviderResponse::new(200, "{}"))
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn send(
        &self,
        provider: &ProviderConfig,
        request: &ProviderRequest,
        api_key: &str,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Per-provider rate-limit detection hook.
///
/// Returns a short description of the signal (e.g. `"HTTP 429"`, or the
/// provider's quota message) when the response says the credential that made
/// the call has run out of quota.
pub trait RateLimitSignalExtractor: Send + Sync {
    fn extract_rate_limit_signal(&self, response: &ProviderResponse) -> Option<String>;
}
