//! Error types and retry classification for provider calls.
//!
//! This module provides:
//! - [`ProviderError`]: The error enum for everything that can go wrong on the wire
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

use crate::registry::CircuitOpenError;

/// HTTP statuses that mean the request itself is wrong, not the provider or the key.
const CALLER_INPUT_STATUSES: &[u16] = &[400, 404, 405, 422];

/// Errors that can occur while calling an external provider.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the orchestrator should handle the error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The call did not complete within the caller-supplied timeout.
    #[error("Timeout after {timeout_ms}ms: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
        /// The timeout that was applied
        timeout_ms: u64,
    },

    /// Connection-level failure (DNS, TLS, reset, body read).
    #[error("Network error: {provider} - {message}")]
    Network {
        /// The provider that was being called
        provider: String,
        /// The underlying transport error
        message: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}: {message}")]
    Http {
        /// The provider that returned the status
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// The request could not be built from the caller's arguments.
    #[error("Invalid request for {provider}: {message}")]
    InvalidRequest {
        /// The provider the request was meant for
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// The provider's rate-limit hook fired for this response.
    #[error("Rate limited: {provider} ({signal})")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
        /// The signal returned by the provider hook
        signal: String,
    },

    /// The circuit breaker is open for this provider.
    #[error("Circuit open: {service}")]
    CircuitOpen {
        /// The protected service name
        service: String,
    },
}

impl ProviderError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyrelay_market_data::errors::{ProviderError, RetryClass};
    ///
    /// let error = ProviderError::Timeout { provider: "finnhub".to_string(), timeout_ms: 5000 };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = ProviderError::Http {
    ///     provider: "finnhub".to_string(),
    ///     status: 422,
    ///     message: "symbol is required".to_string(),
    /// };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidRequest { .. } => RetryClass::Never,
            Self::Http { status, .. } if is_caller_input_status(*status) => RetryClass::Never,

            Self::Timeout { .. } | Self::Network { .. } | Self::Http { .. } => {
                RetryClass::WithBackoff
            }

            Self::RateLimited { .. } => RetryClass::RotateKey,

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }

    /// Whether this error was caused by the caller's own arguments.
    pub fn is_caller_input(&self) -> bool {
        self.retry_class() == RetryClass::Never
    }

    /// HTTP status to record in the usage log, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Short machine-readable error kind for the usage log.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Network { .. } => "network",
            Self::Http { status, .. } if is_caller_input_status(*status) => "invalid_request",
            Self::Http { .. } => "http_error",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::RateLimited { .. } => "rate_limit",
            Self::CircuitOpen { .. } => "circuit_open",
        }
    }
}

impl From<CircuitOpenError> for ProviderError {
    fn from(err: CircuitOpenError) -> Self {
        Self::CircuitOpen {
            service: err.service,
        }
    }
}

/// Returns true for HTTP statuses that point at a malformed request.
pub fn is_caller_input_status(status: u16) -> bool {
    CALLER_INPUT_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_never_retries() {
        let error = ProviderError::InvalidRequest {
            provider: "fmp".to_string(),
            message: "endpoint must be relative".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
        assert!(error.is_caller_input());
    }

    #[test]
    fn test_caller_input_statuses_never_retry() {
        for status in [400, 404, 405, 422] {
            let error = ProviderError::Http {
                provider: "polygon_io".to_string(),
                status,
                message: String::new(),
            };
            assert_eq!(error.retry_class(), RetryClass::Never, "status {}", status);
            assert_eq!(error.error_type(), "invalid_request");
        }
    }

    #[test]
    fn test_server_errors_retry_with_backoff() {
        let error = ProviderError::Http {
            provider: "polygon_io".to_string(),
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
        assert_eq!(error.status_code(), Some(503));
        assert_eq!(error.error_type(), "http_error");
    }

    #[test]
    fn test_unsignalled_429_retries_with_backoff() {
        let error = ProviderError::Http {
            provider: "finnhub".to_string(),
            status: 429,
            message: String::new(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_timeout_and_network_retry_with_backoff() {
        let timeout = ProviderError::Timeout {
            provider: "alpha_vantage".to_string(),
            timeout_ms: 100,
        };
        let network = ProviderError::Network {
            provider: "alpha_vantage".to_string(),
            message: "connection reset".to_string(),
        };
        assert_eq!(timeout.retry_class(), RetryClass::WithBackoff);
        assert_eq!(network.retry_class(), RetryClass::WithBackoff);
        assert_eq!(timeout.status_code(), None);
    }

    #[test]
    fn test_rate_limited_rotates_key() {
        let error = ProviderError::RateLimited {
            provider: "alpha_vantage".to_string(),
            signal: "Note: API call frequency".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::RotateKey);
        assert_eq!(error.status_code(), Some(429));
        assert_eq!(error.error_type(), "rate_limit");
    }

    #[test]
    fn test_circuit_open_from_breaker_error() {
        let error: ProviderError = CircuitOpenError {
            service: "finnhub".to_string(),
        }
        .into();
        assert_eq!(error.retry_class(), RetryClass::CircuitOpen);
    }

    #[test]
    fn test_error_display() {
        let error = ProviderError::Timeout {
            provider: "finnhub".to_string(),
            timeout_ms: 2500,
        };
        assert_eq!(format!("{}", error), "Timeout after 2500ms: finnhub");

        let error = ProviderError::Http {
            provider: "fmp".to_string(),
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(format!("{}", error), "HTTP 500 from fmp: boom");
    }
}
