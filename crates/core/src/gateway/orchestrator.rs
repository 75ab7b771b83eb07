use std::sync::Arc;
use std::time::Instant;

use keyrelay_market_data::{
    CircuitBreakerRegistry, ProviderEntry, ProviderError, ProviderRegistry, ProviderRequest,
    ProviderResponse, ProviderTransport,
};
use log::{debug, warn};

use super::gateway_errors::GatewayError;
use super::gateway_model::{ExecuteRequest, OrchestratorConfig, ProviderHealth};
use crate::credentials::{Credential, KeyPool};
use crate::usage::{CallRecord, UsageRecorder};

/// What a single attempt produced once the response was classified.
enum AttemptOutcome {
    Success(ProviderResponse),
    RateLimited(String),
    Failed(ProviderError),
}

/// Executes provider calls with key selection, rotation, retries and
/// circuit breaking.
pub struct RequestOrchestrator {
    providers: Arc<ProviderRegistry>,
    key_pool: Arc<KeyPool>,
    recorder: Arc<UsageRecorder>,
    breakers: Arc<CircuitBreakerRegistry>,
    transport: Arc<dyn ProviderTransport>,
    config: OrchestratorConfig,
}

impl RequestOrchestrator {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        key_pool: Arc<KeyPool>,
        recorder: Arc<UsageRecorder>,
        breakers: Arc<CircuitBreakerRegistry>,
        transport: Arc<dyn ProviderTransport>,
        config: OrchestratorConfig,
    ) -> Self {
        RequestOrchestrator {
            providers,
            key_pool,
            recorder,
            breakers,
            transport,
            config,
        }
    }

    /// Run `request` against its provider.
    ///
    /// Each attempt picks a key (the one handed over by the last rotation,
    /// else the best key not yet rotated away from), passes the provider's
    /// circuit breaker, sends, and records the outcome before deciding what
    /// to do next:
    ///
    /// - rate-limit signal: the key is marked rate limited and excluded for
    ///   the rest of this call, and the next key is used; no next key ends
    ///   the call with [`GatewayError::NoAvailableCredentials`]
    /// - caller-input error: returned immediately
    /// - other failure: linear backoff, then the next attempt
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ProviderResponse, GatewayError> {
        let entry = self
            .providers
            .get(&request.provider)
            .ok_or_else(|| GatewayError::UnknownProvider {
                provider: request.provider.clone(),
            })?;
        let provider = entry.config.name.as_str();

        let max_retries = request
            .max_retries
            .unwrap_or(self.config.default_max_retries);
        if max_retries == 0 {
            return Err(GatewayError::CallerInput {
                provider: provider.to_string(),
                message: "max_retries must be at least 1".to_string(),
            });
        }

        let call = ProviderRequest {
            endpoint: request.endpoint.clone(),
            method: request.method,
            params: request.params.clone(),
            timeout: request
                .timeout
                .unwrap_or_else(|| entry.config.default_timeout()),
        };
        let breaker = self.breakers.get(provider);

        let mut excluded: Vec<String> = Vec::new();
        let mut handed_over: Option<Credential> = None;
        let mut last_error: Option<GatewayError> = None;

        for attempt in 1..=max_retries {
            if request.cancellation.is_cancelled() {
                return Err(GatewayError::Cancelled {
                    provider: provider.to_string(),
                    attempts: attempt - 1,
                });
            }

            let credential = match handed_over.take() {
                Some(credential) => credential,
                None => self
                    .key_pool
                    .get_best_key(provider, &excluded)?
                    .ok_or_else(|| GatewayError::NoAvailableCredentials {
                        provider: provider.to_string(),
                    })?,
            };

            if !breaker.is_allowed() {
                return Err(GatewayError::CircuitOpen {
                    service: provider.to_string(),
                });
            }

            debug!(
                "{} attempt {}/{} with key '{}'",
                provider, attempt, max_retries, credential.name
            );
            let started = Instant::now();
            let outcome = self.attempt(entry, &call, &credential).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                AttemptOutcome::Success(response) => {
                    breaker.record_success();
                    self.record(
                        &credential,
                        CallRecord::success(&call, response.status, elapsed_ms),
                    )
                    .await;
                    return Ok(response);
                }
                AttemptOutcome::RateLimited(signal) => {
                    let error = ProviderError::RateLimited {
                        provider: provider.to_string(),
                        signal: signal.clone(),
                    };
                    self.record(&credential, CallRecord::failure(&call, &error, elapsed_ms))
                        .await;
                    warn!(
                        "{} rate limited key '{}' ({}), rotating",
                        provider, credential.name, signal
                    );

                    excluded.push(credential.id.clone());
                    last_error = Some(GatewayError::RateLimitSignal {
                        provider: provider.to_string(),
                        credential: credential.id.clone(),
                        signal,
                    });

                    match self.key_pool.rotate_excluding(&credential, &excluded).await? {
                        Some(next) => handed_over = Some(next),
                        None => {
                            return Err(GatewayError::NoAvailableCredentials {
                                provider: provider.to_string(),
                            })
                        }
                    }
                }
                AttemptOutcome::Failed(error) => {
                    breaker.record_failure();
                    self.record(&credential, CallRecord::failure(&call, &error, elapsed_ms))
                        .await;

                    let error = GatewayError::from_provider(provider, error);
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        provider, attempt, max_retries, error
                    );
                    last_error = Some(error);

                    if attempt < max_retries {
                        let delay = self.config.backoff.delay(attempt);
                        tokio::select! {
                            _ = request.cancellation.cancelled() => {
                                return Err(GatewayError::Cancelled {
                                    provider: provider.to_string(),
                                    attempts: attempt,
                                });
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        Err(match last_error {
            Some(last_error) => GatewayError::MaxRetriesExceeded {
                provider: provider.to_string(),
                attempts: max_retries,
                last_error: Box::new(last_error),
            },
            None => GatewayError::NoAvailableCredentials {
                provider: provider.to_string(),
            },
        })
    }

    /// Send once and classify the result.
    async fn attempt(
        &self,
        entry: &ProviderEntry,
        call: &ProviderRequest,
        credential: &Credential,
    ) -> AttemptOutcome {
        let provider = entry.config.name.as_str();
        let sent = tokio::time::timeout(
            call.timeout,
            self.transport.send(&entry.config, call, &credential.secret),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ProviderError::Timeout {
                provider: provider.to_string(),
                timeout_ms: call.timeout.as_millis() as u64,
            })
        });

        let response = match sent {
            Ok(response) => response,
            Err(error) => return AttemptOutcome::Failed(error),
        };

        if let Some(signal) = entry.signal.extract_rate_limit_signal(&response) {
            return AttemptOutcome::RateLimited(signal);
        }

        match response.error_for_status(provider) {
            Ok(response) => AttemptOutcome::Success(response),
            Err(error) => AttemptOutcome::Failed(error),
        }
    }

    /// Record an attempt; a recording failure never replaces the call's outcome.
    async fn record(&self, credential: &Credential, call: CallRecord) {
        if let Err(e) = self.recorder.record(credential, call).await {
            warn!(
                "Failed to record usage for key '{}' ({}): {}",
                credential.name, credential.provider, e
            );
        }
    }

    /// Key health report plus breaker state of `provider`.
    pub fn provider_health(&self, provider: &str) -> Result<ProviderHealth, GatewayError> {
        if !self.providers.contains(provider) {
            return Err(GatewayError::UnknownProvider {
                provider: provider.to_string(),
            });
        }
        let keys = self.key_pool.get_key_health_report(provider)?;
        let circuit = self.breakers.get(provider).metrics();

        Ok(ProviderHealth {
            provider: provider.to_string(),
            circuit_state: circuit.state,
            circuit_failure_count: circuit.failure_count,
            keys,
        })
    }

    pub fn key_pool(&self) -> &Arc<KeyPool> {
        &self.key_pool
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }
}
