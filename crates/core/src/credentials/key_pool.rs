use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use log::{debug, info, warn};
use serde::Deserialize;

use super::credentials_model::{Credential, CredentialEvent, CredentialStatus};
use super::credentials_traits::CredentialRepositoryTrait;
use super::health::{KeyHealthDetail, KeyHealthReport};
use super::scoring::SelectionWeights;
use super::selection_cache::SelectionCache;
use crate::constants::{DEFAULT_SELECTION_CACHE_TTL_SECS, USAGE_SUMMARY_WINDOW_HOURS};
use crate::errors::Result;
use crate::usage::UsageLogReader;
use crate::utils::Clock;

/// Key pool configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyPoolConfig {
    pub weights: SelectionWeights,
    /// Lifetime of a provider's cached best key; 0 disables the cache.
    pub cache_ttl_secs: u64,
}

impl Default for KeyPoolConfig {
    fn default() -> Self {
        Self {
            weights: SelectionWeights::default(),
            cache_ttl_secs: DEFAULT_SELECTION_CACHE_TTL_SECS,
        }
    }
}

impl KeyPoolConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Selects, rotates and recovers the credentials of every provider.
pub struct KeyPool {
    repository: Arc<dyn CredentialRepositoryTrait>,
    usage_reader: Option<Arc<dyn UsageLogReader>>,
    cache: Arc<SelectionCache>,
    weights: SelectionWeights,
    clock: Arc<dyn Clock>,
}

impl KeyPool {
    pub fn new(
        repository: Arc<dyn CredentialRepositoryTrait>,
        config: KeyPoolConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        KeyPool {
            repository,
            usage_reader: None,
            cache: Arc::new(SelectionCache::new(config.cache_ttl())),
            weights: config.weights,
            clock,
        }
    }

    /// Attach the usage log so health reports carry a 24-hour summary.
    pub fn with_usage_reader(mut self, usage_reader: Arc<dyn UsageLogReader>) -> Self {
        self.usage_reader = Some(usage_reader);
        self
    }

    /// The selection cache, to be shared with the usage recorder.
    pub fn cache(&self) -> Arc<SelectionCache> {
        Arc::clone(&self.cache)
    }

    pub fn providers(&self) -> Result<Vec<String>> {
        self.repository.list_providers()
    }

    /// Best active credential of `provider` that is not in `exclude`.
    ///
    /// The per-provider cache is only consulted when `exclude` is empty.
    pub fn get_best_key(&self, provider: &str, exclude: &[String]) -> Result<Option<Credential>> {
        let now = self.clock.now();

        if exclude.is_empty() {
            if let Some(cached) = self.cache.get(provider, now) {
                debug!("Using cached key '{}' for {}", cached.name, provider);
                return Ok(Some(cached));
            }
        }

        let candidates: Vec<Credential> = self
            .repository
            .list_for_provider(provider)?
            .into_iter()
            .filter(|c| c.is_active() && !exclude.contains(&c.id))
            .collect();

        let Some(index) = self.weights.pick_best(&candidates, now) else {
            debug!(
                "No active key for {} ({} excluded)",
                provider,
                exclude.len()
            );
            return Ok(None);
        };

        let best = candidates.into_iter().nth(index);
        if let Some(best) = &best {
            debug!(
                "Selected key '{}' for {} (score {:.1})",
                best.name,
                provider,
                self.weights.score(best, now)
            );
            if exclude.is_empty() {
                self.cache.put(provider, best.clone(), now);
            }
        }
        Ok(best)
    }

    /// Mark `failed` as rate limited and return the next-best other key.
    pub async fn rotate_on_rate_limit(&self, failed: &Credential) -> Result<Option<Credential>> {
        self.rotate_excluding(failed, &[failed.id.clone()]).await
    }

    /// [`rotate_on_rate_limit`](Self::rotate_on_rate_limit) for a rotation
    /// chain: the replacement is never one of `chain`. `failed` is always
    /// excluded, whether or not `chain` lists it.
    pub async fn rotate_excluding(
        &self,
        failed: &Credential,
        chain: &[String],
    ) -> Result<Option<Credential>> {
        let now = self.clock.now();
        let outcome = self
            .repository
            .apply_event(&failed.id, CredentialEvent::RateLimited, now)
            .await?;
        self.cache.invalidate(&failed.provider);

        if outcome.status_changed() {
            info!(
                "Key '{}' for {} marked {} after rate limit",
                failed.name, failed.provider, outcome.credential.status
            );
        }

        let mut exclude = chain.to_vec();
        if !exclude.contains(&failed.id) {
            exclude.push(failed.id.clone());
        }
        let next = self.get_best_key(&failed.provider, &exclude)?;
        match &next {
            Some(next) => info!(
                "Rotated {} from key '{}' to '{}'",
                failed.provider, failed.name, next.name
            ),
            None => warn!(
                "No key left to rotate to for {} after '{}' was rate limited",
                failed.provider, failed.name
            ),
        }
        Ok(next)
    }

    /// Return rate-limited keys whose cool-down has elapsed to active.
    pub async fn recover_rate_limited_keys(&self, provider: &str) -> Result<usize> {
        let now = self.clock.now();
        let mut recovered = 0;

        for credential in self.repository.list_for_provider(provider)? {
            if !credential.is_recoverable(now) {
                continue;
            }
            let outcome = self
                .repository
                .apply_event(&credential.id, CredentialEvent::Recovered, now)
                .await?;
            if outcome.credential.status == CredentialStatus::Active && outcome.status_changed() {
                info!("Recovered key '{}' for {}", credential.name, provider);
                recovered += 1;
            }
        }

        if recovered > 0 {
            self.cache.invalidate(provider);
        }
        Ok(recovered)
    }

    /// Operator reset: back to active with a clean failure count.
    pub async fn reset_credential(&self, id: &str) -> Result<Credential> {
        let outcome = self
            .repository
            .apply_event(id, CredentialEvent::Reset, self.clock.now())
            .await?;
        self.cache.invalidate(&outcome.credential.provider);
        info!(
            "Key '{}' for {} reset (was {})",
            outcome.credential.name, outcome.credential.provider, outcome.previous_status
        );
        Ok(outcome.credential)
    }

    pub fn get_key_health_report(&self, provider: &str) -> Result<KeyHealthReport> {
        let now = self.clock.now();
        let since = now - ChronoDuration::hours(USAGE_SUMMARY_WINDOW_HOURS);

        let keys = self
            .repository
            .list_for_provider(provider)?
            .iter()
            .map(|credential| {
                let score = credential
                    .is_active()
                    .then(|| self.weights.score(credential, now));
                let usage_24h = match &self.usage_reader {
                    Some(reader) => match reader.summarize_since(&credential.id, since) {
                        Ok(summary) => Some(summary),
                        Err(e) => {
                            warn!("Usage summary for key '{}' failed: {}", credential.name, e);
                            None
                        }
                    },
                    None => None,
                };
                KeyHealthDetail::from_credential(credential, now, score, usage_24h)
            })
            .collect();

        Ok(KeyHealthReport::new(provider, keys, now))
    }
}
