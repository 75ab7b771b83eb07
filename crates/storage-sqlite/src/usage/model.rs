//! Database models for the usage log.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use keyrelay_core::usage::UsageLogEntry;

#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::usage_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UsageLogDB {
    pub id: String,
    pub credential_id: String,
    pub provider: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: Option<i32>,
    pub success: bool,
    pub response_time_ms: i64,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub request_params: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<UsageLogEntry> for UsageLogDB {
    fn from(entry: UsageLogEntry) -> Self {
        Self {
            id: entry.id,
            credential_id: entry.credential_id,
            provider: entry.provider,
            endpoint: entry.endpoint,
            method: entry.method,
            status_code: entry.status_code,
            success: entry.success,
            response_time_ms: entry.response_time_ms,
            error_type: entry.error_type,
            error_message: entry.error_message,
            request_params: entry.request_params,
            created_at: entry.created_at.naive_utc(),
        }
    }
}

impl From<UsageLogDB> for UsageLogEntry {
    fn from(db: UsageLogDB) -> Self {
        Self {
            id: db.id,
            credential_id: db.credential_id,
            provider: db.provider,
            endpoint: db.endpoint,
            method: db.method,
            status_code: db.status_code,
            success: db.success,
            response_time_ms: db.response_time_ms,
            error_type: db.error_type,
            error_message: db.error_message,
            request_params: db.request_params,
            created_at: db.created_at.and_utc(),
        }
    }
}
