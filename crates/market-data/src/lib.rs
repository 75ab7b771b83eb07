//! Keyrelay Market Data Crate
//!
//! Provider-facing half of keyrelay: how a single call reaches an external
//! data provider, how its answer is classified, and how a failing provider
//! is fenced off. Credentials are opaque strings here; choosing which one to
//! use is the job of `keyrelay-core`.
//!
//! # Architecture
//!
//! ```text
//!  ProviderRequest + secret
//!            |
//!            v
//!  +--------------------+     +-----------------------+
//!  |   CircuitBreaker   | --> |   ProviderTransport   |  (reqwest)
//!  +--------------------+     +-----------------------+
//!                                        |
//!                                        v
//!                             +-----------------------+
//!                             | RateLimitSignal hook  |  (per provider)
//!                             +-----------------------+
//!                                        |
//!                                        v
//!                          ProviderResponse / ProviderError
//! ```
//!
//! # Core Types
//!
//! - [`ProviderConfig`] - Base URL, key placement, timeout and breaker overrides
//! - [`ProviderRequest`] / [`ProviderResponse`] - One call and its raw answer
//! - [`ProviderError`] - Classified failure with a [`RetryClass`]
//! - [`CircuitBreakerRegistry`] - Breakers keyed by service name

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::{ProviderError, RetryClass};
pub use models::{HttpMethod, ProviderRequest, ProviderResponse};
pub use provider::{
    ApiKeyPlacement, HttpTransport, PatternSignal, ProviderConfig, ProviderTransport,
    RateLimitSignalExtractor, StatusCodeSignal,
};
pub use registry::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitMetrics,
    CircuitOpenError, CircuitState, ProviderEntry, ProviderRegistry,
};
