//! Per-provider credential health report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::credentials_model::{Credential, CredentialStatus};
use crate::usage::UsageSummary;

/// Snapshot of every credential of one provider. Contains no secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyHealthReport {
    pub provider: String,
    pub total: usize,
    pub active: usize,
    pub rate_limited: usize,
    pub disabled: usize,
    pub keys: Vec<KeyHealthDetail>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyHealthDetail {
    pub id: String,
    pub name: String,
    pub status: CredentialStatus,
    pub priority: i32,
    pub usage_today: i64,
    pub usage_this_hour: i64,
    pub total_usage_lifetime: i64,
    pub rate_limit_per_minute: Option<i32>,
    pub rate_limit_daily: Option<i32>,
    pub consecutive_failures: i32,
    pub max_consecutive_failures: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Selection score; only active keys are scored.
    pub score: Option<f64>,
    /// Last 24 hours of the usage log, when a reader is attached.
    pub usage_24h: Option<UsageSummary>,
}

impl KeyHealthDetail {
    pub(crate) fn from_credential(
        credential: &Credential,
        now: DateTime<Utc>,
        score: Option<f64>,
        usage_24h: Option<UsageSummary>,
    ) -> Self {
        Self {
            id: credential.id.clone(),
            name: credential.name.clone(),
            status: credential.status,
            priority: credential.priority,
            usage_today: credential.effective_usage_today(now),
            usage_this_hour: credential.effective_usage_this_hour(now),
            total_usage_lifetime: credential.total_usage_lifetime,
            rate_limit_per_minute: credential.rate_limit_per_minute,
            rate_limit_daily: credential.rate_limit_daily,
            consecutive_failures: credential.consecutive_failures,
            max_consecutive_failures: credential.max_consecutive_failures,
            last_used_at: credential.last_used_at,
            last_success_at: credential.last_success_at,
            last_failure_at: credential.last_failure_at,
            score,
            usage_24h,
        }
    }
}

impl KeyHealthReport {
    pub(crate) fn new(provider: &str, keys: Vec<KeyHealthDetail>, now: DateTime<Utc>) -> Self {
        let count = |status: CredentialStatus| keys.iter().filter(|k| k.status == status).count();
        Self {
            provider: provider.to_string(),
            total: keys.len(),
            active: count(CredentialStatus::Active),
            rate_limited: count(CredentialStatus::RateLimited),
            disabled: count(CredentialStatus::Disabled),
            keys,
            generated_at: now,
        }
    }

    /// At least one key can serve calls right now.
    pub fn is_healthy(&self) -> bool {
        self.active > 0
    }
}
