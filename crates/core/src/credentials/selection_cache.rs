//! Short-lived cache of each provider's best credential.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::debug;

use super::credentials_model::Credential;

#[derive(Clone)]
struct CachedSelection {
    credential: Credential,
    cached_at: DateTime<Utc>,
}

/// Provider name to best credential, valid for `ttl`.
///
/// Shared between the key pool (reads, fills, invalidates on rotation and
/// recovery) and the usage recorder (invalidates when a key gets disabled).
/// A zero TTL turns the cache off.
pub struct SelectionCache {
    entries: DashMap<String, CachedSelection>,
    ttl: Duration,
}

impl SelectionCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::zero()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl > Duration::zero()
    }

    pub fn get(&self, provider: &str, now: DateTime<Utc>) -> Option<Credential> {
        if !self.is_enabled() {
            return None;
        }
        let entry = self.entries.get(provider)?;
        if now - entry.cached_at < self.ttl {
            Some(entry.credential.clone())
        } else {
            None
        }
    }

    pub fn put(&self, provider: &str, credential: Credential, now: DateTime<Utc>) {
        if !self.is_enabled() {
            return;
        }
        self.entries.insert(
            provider.to_string(),
            CachedSelection {
                credential,
                cached_at: now,
            },
        );
    }

    pub fn invalidate(&self, provider: &str) {
        if self.entries.remove(provider).is_some() {
            debug!("Selection cache invalidated for '{}'", provider);
        }
    }
}
