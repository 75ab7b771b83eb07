/// Classification for retry policy.
///
/// Used by the request orchestrator to decide what to do with a failed call.
///
/// # Behavior Summary
///
/// | Class | Retry? | Counts against the credential? |
/// |-------|--------|--------------------------------|
/// | `Never` | No, surfaced immediately | Yes |
/// | `WithBackoff` | Yes, after a linear backoff | Yes |
/// | `RotateKey` | Yes, with the next-best key | Yes (rate-limit event) |
/// | `CircuitOpen` | No, fail fast | No (no call was made) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the request itself is invalid.
    /// Retrying with another key or after a delay won't help.
    Never,

    /// Retry after a backoff delay.
    ///
    /// Used for transient errors like timeouts, connection resets and 5xx
    /// responses. Each failure is recorded against the credential and the
    /// provider's circuit breaker.
    WithBackoff,

    /// The credential hit its quota; retry with a different key.
    RotateKey,

    /// Circuit breaker is open for this provider.
    /// Don't call it until the breaker lets a probe through.
    CircuitOpen,
}
