use keyrelay_market_data::{ProviderError, RetryClass};
use thiserror::Error;

use crate::errors::Error;

/// Errors surfaced by [`RequestOrchestrator::execute`](super::RequestOrchestrator::execute).
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Every key of the provider is excluded, rate limited or disabled.
    #[error("No available credentials for provider '{provider}'")]
    NoAvailableCredentials { provider: String },

    /// The provider's rate-limit hook fired. Handled by rotation; only
    /// surfaced as the last error of [`GatewayError::MaxRetriesExceeded`].
    #[error("Rate limit signal from {provider} on key {credential}: {signal}")]
    RateLimitSignal {
        provider: String,
        credential: String,
        signal: String,
    },

    /// Retryable provider failure (timeout, network, 5xx, ...).
    #[error("Transient provider error: {0}")]
    Transient(ProviderError),

    /// The request itself is wrong; never retried.
    #[error("Invalid request for {provider}: {message}")]
    CallerInput { provider: String, message: String },

    #[error("Max retries ({attempts}) exceeded for {provider}: {last_error}")]
    MaxRetriesExceeded {
        provider: String,
        attempts: u32,
        #[source]
        last_error: Box<GatewayError>,
    },

    #[error("Circuit breaker for '{service}' is OPEN - calls blocked")]
    CircuitOpen { service: String },

    #[error("Unknown provider '{provider}'")]
    UnknownProvider { provider: String },

    #[error("Request to {provider} cancelled after {attempts} attempt(s)")]
    Cancelled { provider: String, attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] Error),
}

impl GatewayError {
    /// Map a failed provider call onto the gateway taxonomy.
    pub fn from_provider(provider: &str, error: ProviderError) -> Self {
        match error.retry_class() {
            RetryClass::Never => GatewayError::CallerInput {
                provider: provider.to_string(),
                message: error.to_string(),
            },
            RetryClass::CircuitOpen => GatewayError::CircuitOpen {
                service: provider.to_string(),
            },
            RetryClass::WithBackoff | RetryClass::RotateKey => GatewayError::Transient(error),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Transient(_) | GatewayError::RateLimitSignal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider_classification() {
        let caller = GatewayError::from_provider(
            "acme",
            ProviderError::Http {
                provider: "acme".to_string(),
                status: 404,
                message: "not found".to_string(),
            },
        );
        assert!(matches!(caller, GatewayError::CallerInput { .. }));
        assert!(!caller.is_retryable());

        let transient = GatewayError::from_provider(
            "acme",
            ProviderError::Http {
                provider: "acme".to_string(),
                status: 503,
                message: "unavailable".to_string(),
            },
        );
        assert!(transient.is_retryable());
    }

    #[test]
    fn test_max_retries_exposes_source() {
        use std::error::Error as _;

        let err = GatewayError::MaxRetriesExceeded {
            provider: "acme".to_string(),
            attempts: 3,
            last_error: Box::new(GatewayError::RateLimitSignal {
                provider: "acme".to_string(),
                credential: "D".to_string(),
                signal: "HTTP 429".to_string(),
            }),
        };
        assert!(err.to_string().starts_with("Max retries (3) exceeded for acme"));
        assert!(err.source().is_some());
    }
}
