use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::credentials::KeyPool;
use crate::errors::Result;

/// Outcome of one sweep over all providers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Recovered key count per provider, providers with none omitted.
    pub recovered: BTreeMap<String, usize>,
    /// Providers whose recovery failed.
    pub failed: Vec<String>,
}

impl SweepReport {
    pub fn total_recovered(&self) -> usize {
        self.recovered.values().sum()
    }
}

/// Runs [`KeyPool::recover_rate_limited_keys`] for every provider.
///
/// Scheduling is left to the host; each call is a single pass.
pub struct RecoverySweeper {
    key_pool: Arc<KeyPool>,
}

impl RecoverySweeper {
    pub fn new(key_pool: Arc<KeyPool>) -> Self {
        Self { key_pool }
    }

    /// One pass over every provider with credentials.
    ///
    /// A provider that fails is logged and reported; the others still run.
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for provider in self.key_pool.providers()? {
            match self.key_pool.recover_rate_limited_keys(&provider).await {
                Ok(0) => {}
                Ok(count) => {
                    report.recovered.insert(provider, count);
                }
                Err(e) => {
                    warn!("Recovery sweep failed for {}: {}", provider, e);
                    report.failed.push(provider);
                }
            }
        }

        if report.total_recovered() > 0 {
            info!(
                "Recovery sweep returned {} key(s) to service",
                report.total_recovered()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{
        CredentialRepositoryTrait, CredentialStatus, KeyPoolConfig, NewCredential,
    };
    use crate::test_support::{seed, MockCredentialRepository};
    use crate::utils::{Clock, ManualClock};
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_sweep_recovers_across_providers() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let repository = Arc::new(MockCredentialRepository::new());
        let pool = Arc::new(KeyPool::new(
            repository.clone(),
            KeyPoolConfig::default(),
            Arc::new(clock.clone()),
        ));

        let a = seed(&repository, NewCredential::new("acme", "A", "s"), clock.now());
        let mut fast = NewCredential::new("globex", "G", "s");
        fast.auto_recover_after_minutes = 5;
        let g = seed(&repository, fast, clock.now());
        seed(&repository, NewCredential::new("initech", "I", "s"), clock.now());

        pool.rotate_on_rate_limit(&a).await.unwrap();
        pool.rotate_on_rate_limit(&g).await.unwrap();

        let sweeper = RecoverySweeper::new(pool.clone());

        clock.advance(Duration::minutes(10));
        let report = sweeper.sweep_once().await.unwrap();
        assert_eq!(report.total_recovered(), 1);
        assert_eq!(report.recovered.get("globex"), Some(&1));
        assert!(report.failed.is_empty());

        clock.advance(Duration::minutes(50));
        let report = sweeper.sweep_once().await.unwrap();
        assert_eq!(report.recovered.get("acme"), Some(&1));
        assert_eq!(
            repository.get_credential(&a.id).unwrap().status,
            CredentialStatus::Active
        );
    }
}
