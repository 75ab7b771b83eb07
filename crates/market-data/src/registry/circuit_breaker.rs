//! Circuit breaker for a single protected service.
//!
//! Implements the circuit breaker pattern to stop calling a provider that is
//! systemically failing. The circuit has three states:
//!
//! - **Closed**: Normal operation, calls are allowed through.
//! - **Open**: Provider is failing, calls fail fast with [`CircuitOpenError`].
//! - **HalfOpen**: Timeout elapsed, probe calls are let through.
//!
//! The circuit breaker is in-memory and resets on process restart. It is
//! independent from credential health: a breaker trips on provider outages,
//! a credential is rotated on its own quota.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Default number of failures before opening the circuit.
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default time to wait before transitioning from Open to HalfOpen.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of successful probes needed to close the circuit from HalfOpen.
const DEFAULT_HALF_OPEN_MAX_CALLS: u32 = 2;

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - calls are allowed.
    Closed,
    /// Service is failing - calls are blocked.
    Open,
    /// Testing recovery - probe calls allowed.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Returned instead of invoking the operation while the circuit is open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Circuit breaker for '{service}' is OPEN - calls blocked")]
pub struct CircuitOpenError {
    pub service: String,
}

/// Circuit breaker configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Number of failures in Closed state before opening the circuit.
    pub failure_threshold: u32,
    /// Time to wait in Open state before letting a probe through.
    #[serde(rename = "timeout_seconds", deserialize_with = "duration_from_secs")]
    pub timeout: Duration,
    /// Number of successful probes needed to close from HalfOpen.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout: DEFAULT_TIMEOUT,
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
        }
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

/// Internal circuit state.
#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    /// Failures since the last reset.
    failure_count: u32,
    /// Successful probes in HalfOpen state.
    half_open_successes: u32,
    /// Time of the last failure (for the open timeout).
    last_failure: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_successes: 0,
            last_failure: None,
        }
    }
}

/// Snapshot of a single circuit.
#[derive(Clone, Debug)]
pub struct CircuitMetrics {
    /// Protected service name.
    pub service: String,
    /// Current circuit state.
    pub state: CircuitState,
    /// Number of recorded failures.
    pub failure_count: u32,
    /// Successful probes since entering HalfOpen.
    pub half_open_successes: u32,
    /// Time of the last failure.
    pub last_failure: Option<Instant>,
}

/// Circuit breaker protecting one service.
///
/// Thread-safe; instances are handed out by
/// [`CircuitBreakerRegistry`](super::CircuitBreakerRegistry) and shared
/// between concurrent callers of the same service.
pub struct CircuitBreaker {
    service: String,
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a circuit breaker with default settings.
    pub fn new(service: impl Into<String>) -> Self {
        Self::with_config(service, CircuitBreakerConfig::default())
    }

    /// Create a circuit breaker with custom configuration.
    pub fn with_config(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            service: service.into(),
            circuit: Mutex::new(Circuit::new()),
            config,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Lock the circuit, recovering from poison if necessary.
    ///
    /// The worst case of a poisoned circuit is a slightly wrong state,
    /// which is better than panicking on every later call.
    fn lock_circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(|poisoned| {
            warn!(
                "Circuit breaker mutex for '{}' was poisoned, recovering",
                self.service
            );
            poisoned.into_inner()
        })
    }

    /// Run `operation` under the breaker.
    ///
    /// Fails with [`CircuitOpenError`] (converted into `E`) without invoking
    /// `operation` while the circuit is open and the timeout has not
    /// elapsed. Every `Err` returned by `operation` counts as a failure.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        if !self.is_allowed() {
            debug!("Circuit breaker: blocking call to '{}'", self.service);
            return Err(CircuitOpenError {
                service: self.service.clone(),
            }
            .into());
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    /// Check if calls are allowed.
    ///
    /// Returns true if the circuit is Closed or HalfOpen.
    /// Returns false if the circuit is Open and the timeout has not elapsed.
    ///
    /// Handles the Open -> HalfOpen transition once the timeout has elapsed.
    pub fn is_allowed(&self) -> bool {
        let mut circuit = self.lock_circuit();

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = circuit
                    .last_failure
                    .map(|last| last.elapsed() >= self.config.timeout)
                    .unwrap_or(true);
                if elapsed {
                    info!(
                        "Circuit breaker: transitioning '{}' from Open to HalfOpen",
                        self.service
                    );
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_successes = 0;
                }
                elapsed
            }
        }
    }

    /// Record a successful call.
    ///
    /// In Closed state: resets the failure count.
    /// In HalfOpen state: counts the probe, may close the circuit.
    pub fn record_success(&self) {
        let mut circuit = self.lock_circuit();

        match circuit.state {
            CircuitState::Closed => {
                circuit.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                circuit.half_open_successes += 1;
                debug!(
                    "Circuit breaker: probe succeeded for '{}' ({}/{})",
                    self.service, circuit.half_open_successes, self.config.half_open_max_calls
                );

                if circuit.half_open_successes >= self.config.half_open_max_calls {
                    info!(
                        "Circuit breaker: closing circuit for '{}' after {} probes",
                        self.service, circuit.half_open_successes
                    );
                    *circuit = Circuit::new();
                }
            }
            CircuitState::Open => {
                // A call admitted before the circuit opened finished late.
                debug!(
                    "Circuit breaker: late success for '{}' in Open state",
                    self.service
                );
            }
        }
    }

    /// Record a failed call.
    ///
    /// Increments the failure count and may open the circuit.
    /// In HalfOpen state, any failure immediately reopens it.
    pub fn record_failure(&self) {
        let mut circuit = self.lock_circuit();

        circuit.failure_count += 1;
        circuit.last_failure = Some(Instant::now());

        match circuit.state {
            CircuitState::Closed => {
                if circuit.failure_count >= self.config.failure_threshold {
                    warn!(
                        "Circuit breaker: opening circuit for '{}' after {} failures",
                        self.service, circuit.failure_count
                    );
                    circuit.state = CircuitState::Open;
                } else {
                    debug!(
                        "Circuit breaker: failure for '{}' ({}/{})",
                        self.service, circuit.failure_count, self.config.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                warn!(
                    "Circuit breaker: reopening circuit for '{}' after failed probe",
                    self.service
                );
                circuit.state = CircuitState::Open;
                circuit.half_open_successes = 0;
            }
            CircuitState::Open => {
                debug!(
                    "Circuit breaker: additional failure for '{}' (already open)",
                    self.service
                );
            }
        }
    }

    /// Current state, without applying the Open -> HalfOpen transition.
    pub fn state(&self) -> CircuitState {
        self.lock_circuit().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock_circuit().failure_count
    }

    /// Reset the circuit to Closed.
    pub fn reset(&self) {
        info!(
            "Circuit breaker: manually resetting circuit for '{}'",
            self.service
        );
        *self.lock_circuit() = Circuit::new();
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let circuit = self.lock_circuit();
        CircuitMetrics {
            service: self.service.clone(),
            state: circuit.state,
            failure_count: circuit.failure_count,
            half_open_successes: circuit.half_open_successes,
            last_failure: circuit.last_failure,
        }
    }
}
