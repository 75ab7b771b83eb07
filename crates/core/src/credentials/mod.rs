//! Credentials module - models, state machine, selection and health.

mod credentials_model;
mod credentials_traits;
mod health;
mod key_pool;
mod scoring;
mod selection_cache;

pub use credentials_model::{
    Credential, CredentialEvent, CredentialStatus, EventOutcome, NewCredential,
};
pub use credentials_traits::CredentialRepositoryTrait;
pub use health::{KeyHealthDetail, KeyHealthReport};
pub use key_pool::{KeyPool, KeyPoolConfig};
pub use scoring::SelectionWeights;
pub use selection_cache::SelectionCache;
