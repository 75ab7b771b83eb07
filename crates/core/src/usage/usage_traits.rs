use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::usage::usage_model::{UsageLogEntry, UsageSummary};

/// Append-only destination of usage log entries.
#[async_trait]
pub trait UsageLogSink: Send + Sync {
    async fn append(&self, entry: UsageLogEntry) -> Result<()>;
}

/// Read side of the usage log, used by health reports.
pub trait UsageLogReader: Send + Sync {
    fn summarize_since(&self, credential_id: &str, since: DateTime<Utc>) -> Result<UsageSummary>;
}
