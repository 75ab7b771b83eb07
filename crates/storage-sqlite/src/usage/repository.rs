use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;

use keyrelay_core::errors::Result;
use keyrelay_core::usage::{UsageLogEntry, UsageLogReader, UsageLogSink, UsageSummary};

use super::model::UsageLogDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::usage_logs;
use crate::schema::usage_logs::dsl::*;

const RATE_LIMIT_ERROR_TYPE: &str = "rate_limit";

/// Append-only usage log backed by the `usage_logs` table.
pub struct UsageLogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl UsageLogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        UsageLogRepository { pool, writer }
    }

    /// Most recent entries of a credential, newest first.
    pub fn list_recent(&self, for_credential: &str, limit: i64) -> Result<Vec<UsageLogEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = usage_logs
            .filter(credential_id.eq(for_credential))
            .order((created_at.desc(), id.desc()))
            .limit(limit)
            .select(UsageLogDB::as_select())
            .load::<UsageLogDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(UsageLogEntry::from).collect())
    }
}

#[async_trait]
impl UsageLogSink for UsageLogRepository {
    async fn append(&self, entry: UsageLogEntry) -> Result<()> {
        let entry_db = UsageLogDB::from(entry);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(usage_logs::table)
                    .values(&entry_db)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

impl UsageLogReader for UsageLogRepository {
    fn summarize_since(&self, for_credential: &str, since: DateTime<Utc>) -> Result<UsageSummary> {
        let mut conn = get_connection(&self.pool)?;
        let rows = usage_logs
            .filter(credential_id.eq(for_credential))
            .filter(created_at.ge(since.naive_utc()))
            .select((success, error_type, response_time_ms))
            .load::<(bool, Option<String>, i64)>(&mut conn)
            .map_err(StorageError::from)?;

        let mut summary = UsageSummary::default();
        let mut total_ms: i64 = 0;
        for (ok, kind, elapsed) in rows {
            summary.requests += 1;
            total_ms = total_ms.saturating_add(elapsed);
            if !ok {
                summary.failures += 1;
            }
            if kind.as_deref() == Some(RATE_LIMIT_ERROR_TYPE) {
                summary.rate_limit_hits += 1;
            }
        }
        if summary.requests > 0 {
            summary.avg_response_time_ms = Some(total_ms as f64 / summary.requests as f64);
        }
        Ok(summary)
    }
}
