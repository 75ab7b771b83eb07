//! Provider registry and fault isolation.
//!
//! - [`ProviderRegistry`]: configured providers and their rate-limit hooks
//! - [`CircuitBreaker`]: per-service Closed/Open/HalfOpen guard
//! - [`CircuitBreakerRegistry`]: process-wide breakers keyed by service name

mod breaker_registry;
mod circuit_breaker;
mod provider_registry;

pub use breaker_registry::CircuitBreakerRegistry;
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitOpenError, CircuitState,
};
pub use provider_registry::{ProviderEntry, ProviderRegistry};
