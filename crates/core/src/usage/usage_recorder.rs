use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use super::usage_model::{CallRecord, UsageLogEntry};
use super::usage_traits::UsageLogSink;
use crate::constants::MAX_LOGGED_ERROR_MESSAGE_LEN;
use crate::credentials::{
    Credential, CredentialEvent, CredentialRepositoryTrait, CredentialStatus, SelectionCache,
};
use crate::errors::Result;
use crate::utils::Clock;

/// Writes the usage log and folds each call outcome into the credential.
pub struct UsageRecorder {
    repository: Arc<dyn CredentialRepositoryTrait>,
    sink: Arc<dyn UsageLogSink>,
    cache: Arc<SelectionCache>,
    clock: Arc<dyn Clock>,
}

impl UsageRecorder {
    pub fn new(
        repository: Arc<dyn CredentialRepositoryTrait>,
        sink: Arc<dyn UsageLogSink>,
        cache: Arc<SelectionCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        UsageRecorder {
            repository,
            sink,
            cache,
            clock,
        }
    }

    /// Append a usage log entry for `call` and apply its outcome to `credential`.
    ///
    /// A failing sink is logged and ignored. Errors from the credential
    /// store are returned.
    pub async fn record(&self, credential: &Credential, call: CallRecord) -> Result<Credential> {
        let now = self.clock.now();
        let entry = UsageLogEntry {
            id: Uuid::now_v7().to_string(),
            credential_id: credential.id.clone(),
            provider: credential.provider.clone(),
            endpoint: call.endpoint,
            method: call.method.as_str().to_string(),
            status_code: call.status_code.map(i32::from),
            success: call.success,
            response_time_ms: i64::try_from(call.elapsed_ms).unwrap_or(i64::MAX),
            error_type: call.error_type,
            error_message: call.error_message.map(truncate_message),
            request_params: Some(call.params.to_string()),
            created_at: now,
        };

        if let Err(e) = self.sink.append(entry).await {
            warn!(
                "Failed to append usage log entry for key '{}' ({}): {}",
                credential.name, credential.provider, e
            );
        }

        let event = if call.success {
            CredentialEvent::Success
        } else {
            CredentialEvent::Failure
        };
        let outcome = self
            .repository
            .apply_event(&credential.id, event, now)
            .await?;

        if outcome.status_changed() && outcome.credential.status == CredentialStatus::Disabled {
            warn!(
                "Key '{}' for {} disabled after {} consecutive failures",
                credential.name, credential.provider, outcome.credential.consecutive_failures
            );
            self.cache.invalidate(&credential.provider);
        } else {
            debug!(
                "Recorded {} for key '{}' ({})",
                if call.success { "success" } else { "failure" },
                credential.name,
                credential.provider
            );
        }

        Ok(outcome.credential)
    }
}

fn truncate_message(message: String) -> String {
    if message.chars().count() <= MAX_LOGGED_ERROR_MESSAGE_LEN {
        return message;
    }
    message.chars().take(MAX_LOGGED_ERROR_MESSAGE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::NewCredential;
    use crate::test_support::{seed, MockCredentialRepository, MockUsageSink};
    use crate::utils::ManualClock;
    use chrono::{TimeZone, Utc};
    use keyrelay_market_data::{ProviderError, ProviderRequest};
    use std::time::Duration;

    struct Fixture {
        repository: Arc<MockCredentialRepository>,
        sink: Arc<MockUsageSink>,
        cache: Arc<SelectionCache>,
        clock: ManualClock,
        recorder: UsageRecorder,
    }

    fn fixture(sink: MockUsageSink) -> Fixture {
        let repository = Arc::new(MockCredentialRepository::new());
        let sink = Arc::new(sink);
        let cache = Arc::new(SelectionCache::new(Duration::from_secs(60)));
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let recorder = UsageRecorder::new(
            repository.clone(),
            sink.clone(),
            cache.clone(),
            Arc::new(clock.clone()),
        );
        Fixture {
            repository,
            sink,
            cache,
            clock,
            recorder,
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest::get("/quote", Duration::from_secs(5)).with_param("symbol", "MSFT")
    }

    fn timeout() -> ProviderError {
        ProviderError::Timeout {
            provider: "acme".to_string(),
            timeout_ms: 5000,
        }
    }

    #[tokio::test]
    async fn test_success_appends_entry_and_updates_credential() {
        let f = fixture(MockUsageSink::new());
        let key = seed(&f.repository, NewCredential::new("acme", "A", "s"), f.clock.now());

        let updated = f
            .recorder
            .record(&key, CallRecord::success(&request(), 200, 87))
            .await
            .unwrap();

        assert_eq!(updated.usage_this_hour, 1);
        assert_eq!(updated.total_usage_lifetime, 1);
        assert_eq!(updated.last_success_at, Some(f.clock.now()));

        let entries = f.sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].credential_id, key.id);
        assert_eq!(entries[0].status_code, Some(200));
        assert_eq!(entries[0].response_time_ms, 87);
        assert_eq!(entries[0].method, "GET");
        assert_eq!(
            entries[0].request_params.as_deref(),
            Some(r#"{"symbol":"MSFT"}"#)
        );
    }

    #[tokio::test]
    async fn test_failure_threshold_disables_and_invalidates_cache() {
        let f = fixture(MockUsageSink::new());
        let mut new = NewCredential::new("acme", "A", "s");
        new.max_consecutive_failures = 2;
        let key = seed(&f.repository, new, f.clock.now());
        f.cache.put("acme", key.clone(), f.clock.now());

        let once = f
            .recorder
            .record(&key, CallRecord::failure(&request(), &timeout(), 5000))
            .await
            .unwrap();
        assert_eq!(once.status, CredentialStatus::Active);
        assert!(f.cache.get("acme", f.clock.now()).is_some());

        let twice = f
            .recorder
            .record(&key, CallRecord::failure(&request(), &timeout(), 5000))
            .await
            .unwrap();
        assert_eq!(twice.status, CredentialStatus::Disabled);
        assert_eq!(twice.consecutive_failures, 2);
        assert!(f.cache.get("acme", f.clock.now()).is_none());

        let entries = f.sink.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.success));
        assert_eq!(entries[0].error_type.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_sink_failure_still_updates_credential() {
        let f = fixture(MockUsageSink::failing());
        let key = seed(&f.repository, NewCredential::new("acme", "A", "s"), f.clock.now());

        let updated = f
            .recorder
            .record(&key, CallRecord::success(&request(), 200, 10))
            .await
            .unwrap();

        assert_eq!(updated.usage_today, 1);
        assert_eq!(f.repository.get_credential(&key.id).unwrap().usage_today, 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let f = fixture(MockUsageSink::new());
        let key = seed(&f.repository, NewCredential::new("acme", "A", "s"), f.clock.now());
        *f.repository.fail_writes.lock().unwrap() = true;

        let result = f
            .recorder
            .record(&key, CallRecord::success(&request(), 200, 10))
            .await;

        assert!(result.is_err());
        assert_eq!(f.sink.entries().len(), 1);
    }

    #[test]
    fn test_truncate_message() {
        let long = "x".repeat(MAX_LOGGED_ERROR_MESSAGE_LEN + 20);
        assert_eq!(truncate_message(long).len(), MAX_LOGGED_ERROR_MESSAGE_LEN);
        assert_eq!(truncate_message("short".to_string()), "short");
    }
}
