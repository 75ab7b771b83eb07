//! In-memory doubles shared by the unit tests of this crate.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::credentials::{
    Credential, CredentialEvent, CredentialRepositoryTrait, EventOutcome, NewCredential,
};
use crate::errors::{DatabaseError, Error, Result};
use crate::usage::{UsageLogEntry, UsageLogReader, UsageLogSink, UsageSummary};

#[derive(Default)]
pub struct MockCredentialRepository {
    credentials: Mutex<Vec<Credential>>,
    pub fail_writes: Mutex<bool>,
}

impl MockCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credential: Credential) {
        self.credentials.lock().unwrap().push(credential);
    }
}

/// Insert `new` with its name as id (unless it carries one).
pub fn seed(
    repository: &MockCredentialRepository,
    new: NewCredential,
    now: DateTime<Utc>,
) -> Credential {
    let id = new.id.clone().unwrap_or_else(|| new.name.clone());
    let credential = new.into_credential(id, now);
    repository.insert(credential.clone());
    credential
}

#[async_trait]
impl CredentialRepositoryTrait for MockCredentialRepository {
    fn list_for_provider(&self, provider: &str) -> Result<Vec<Credential>> {
        let mut found: Vec<Credential> = self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.provider == provider)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (a.priority, a.created_at, &a.id).cmp(&(b.priority, b.created_at, &b.id))
        });
        Ok(found)
    }

    fn get_credential(&self, id: &str) -> Result<Credential> {
        self.credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::CredentialNotFound(id.to_string()))
    }

    fn list_providers(&self) -> Result<Vec<String>> {
        let mut providers: Vec<String> = self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.provider.clone())
            .collect();
        providers.sort();
        providers.dedup();
        Ok(providers)
    }

    async fn create_credential(&self, new_credential: NewCredential) -> Result<Credential> {
        new_credential.validate()?;
        Ok(seed(self, new_credential, Utc::now()))
    }

    async fn apply_event(
        &self,
        id: &str,
        event: CredentialEvent,
        at: DateTime<Utc>,
    ) -> Result<EventOutcome> {
        if *self.fail_writes.lock().unwrap() {
            return Err(DatabaseError::QueryFailed("database is locked".to_string()).into());
        }
        let mut credentials = self.credentials.lock().unwrap();
        let credential = credentials
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::CredentialNotFound(id.to_string()))?;
        let previous_status = credential.apply(event, at);
        Ok(EventOutcome {
            credential: credential.clone(),
            previous_status,
        })
    }
}

/// Sink that keeps entries in memory, or fails every append.
#[derive(Default)]
pub struct MockUsageSink {
    pub entries: Arc<Mutex<Vec<UsageLogEntry>>>,
    pub fail: bool,
}

impl MockUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> Vec<UsageLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageLogSink for MockUsageSink {
    async fn append(&self, entry: UsageLogEntry) -> Result<()> {
        if self.fail {
            return Err(Error::Repository("usage log unavailable".to_string()));
        }
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

pub struct MockUsageReader {
    summary: UsageSummary,
}

impl MockUsageReader {
    pub fn new(summary: UsageSummary) -> Self {
        Self { summary }
    }
}

impl UsageLogReader for MockUsageReader {
    fn summarize_since(&self, _credential_id: &str, _since: DateTime<Utc>) -> Result<UsageSummary> {
        Ok(self.summary.clone())
    }
}
