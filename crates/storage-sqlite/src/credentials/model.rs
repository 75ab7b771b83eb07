//! Database models for credentials.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use keyrelay_core::credentials::{Credential, CredentialStatus};
use keyrelay_core::errors::Error;

/// Database model for credentials. Timestamps are stored as naive UTC.
#[derive(
    Queryable, Identifiable, AsChangeset, Selectable, Insertable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::credentials)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct CredentialDB {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub secret: String,
    pub status: String,
    pub priority: i32,
    pub rate_limit_per_minute: Option<i32>,
    pub rate_limit_daily: Option<i32>,
    pub usage_today: i64,
    pub usage_today_reset_at: NaiveDateTime,
    pub usage_this_hour: i64,
    pub usage_hour_reset_at: NaiveDateTime,
    pub last_used_at: Option<NaiveDateTime>,
    pub last_success_at: Option<NaiveDateTime>,
    pub last_failure_at: Option<NaiveDateTime>,
    pub consecutive_failures: i32,
    pub max_consecutive_failures: i32,
    pub auto_recover_after_minutes: i32,
    pub total_usage_lifetime: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}

impl TryFrom<CredentialDB> for Credential {
    type Error = Error;

    fn try_from(db: CredentialDB) -> Result<Self, Self::Error> {
        Ok(Self {
            status: CredentialStatus::from_str(&db.status)?,
            id: db.id,
            provider: db.provider,
            name: db.name,
            secret: db.secret,
            priority: db.priority,
            rate_limit_per_minute: db.rate_limit_per_minute,
            rate_limit_daily: db.rate_limit_daily,
            usage_today: db.usage_today,
            usage_today_reset_at: utc(db.usage_today_reset_at),
            usage_this_hour: db.usage_this_hour,
            usage_hour_reset_at: utc(db.usage_hour_reset_at),
            last_used_at: db.last_used_at.map(utc),
            last_success_at: db.last_success_at.map(utc),
            last_failure_at: db.last_failure_at.map(utc),
            consecutive_failures: db.consecutive_failures,
            max_consecutive_failures: db.max_consecutive_failures,
            auto_recover_after_minutes: db.auto_recover_after_minutes,
            total_usage_lifetime: db.total_usage_lifetime,
            created_at: utc(db.created_at),
            updated_at: utc(db.updated_at),
        })
    }
}

impl From<Credential> for CredentialDB {
    fn from(domain: Credential) -> Self {
        Self {
            id: domain.id,
            provider: domain.provider,
            name: domain.name,
            secret: domain.secret,
            status: domain.status.as_str().to_string(),
            priority: domain.priority,
            rate_limit_per_minute: domain.rate_limit_per_minute,
            rate_limit_daily: domain.rate_limit_daily,
            usage_today: domain.usage_today,
            usage_today_reset_at: domain.usage_today_reset_at.naive_utc(),
            usage_this_hour: domain.usage_this_hour,
            usage_hour_reset_at: domain.usage_hour_reset_at.naive_utc(),
            last_used_at: domain.last_used_at.map(|t| t.naive_utc()),
            last_success_at: domain.last_success_at.map(|t| t.naive_utc()),
            last_failure_at: domain.last_failure_at.map(|t| t.naive_utc()),
            consecutive_failures: domain.consecutive_failures,
            max_consecutive_failures: domain.max_consecutive_failures,
            auto_recover_after_minutes: domain.auto_recover_after_minutes,
            total_usage_lifetime: domain.total_usage_lifetime,
            created_at: domain.created_at.naive_utc(),
            updated_at: domain.updated_at.naive_utc(),
        }
    }
}
