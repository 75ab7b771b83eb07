use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::credentials::credentials_model::{
    Credential, CredentialEvent, EventOutcome, NewCredential,
};
use crate::errors::Result;

/// Trait for credential repository operations.
///
/// `apply_event` must be atomic per credential: load the row, run
/// [`Credential::apply`], store it, all inside one write transaction.
#[async_trait]
pub trait CredentialRepositoryTrait: Send + Sync {
    /// Credentials of `provider` ordered by priority, then creation time, then id.
    fn list_for_provider(&self, provider: &str) -> Result<Vec<Credential>>;
    fn get_credential(&self, id: &str) -> Result<Credential>;
    /// Distinct provider names that have at least one credential.
    fn list_providers(&self) -> Result<Vec<String>>;
    async fn create_credential(&self, new_credential: NewCredential) -> Result<Credential>;
    async fn apply_event(
        &self,
        id: &str,
        event: CredentialEvent,
        at: DateTime<Utc>,
    ) -> Result<EventOutcome>;
}
