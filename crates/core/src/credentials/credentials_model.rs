//! Credential domain models and the credential state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTO_RECOVER_AFTER_MINUTES, DEFAULT_CREDENTIAL_PRIORITY,
    DEFAULT_MAX_CONSECUTIVE_FAILURES,
};
use crate::errors::{Result, ValidationError};
use crate::utils::time_utils::{day_window_start, hour_window_start};

/// Health status of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    RateLimited,
    Disabled,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Active => "active",
            CredentialStatus::RateLimited => "rate_limited",
            CredentialStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(CredentialStatus::Active),
            "rate_limited" => Ok(CredentialStatus::RateLimited),
            "disabled" => Ok(CredentialStatus::Disabled),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown credential status '{}'",
                other
            ))),
        }
    }
}

/// Everything that may change a credential's health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEvent {
    /// A call with this credential succeeded.
    Success,
    /// A call with this credential failed (rate limits included).
    Failure,
    /// The provider signalled that this credential is out of quota.
    RateLimited,
    /// The recovery sweep found the cool-down elapsed.
    Recovered,
    /// Operator override back to active.
    Reset,
}

/// One API key belonging to one provider.
///
/// The secret never leaves this struct through `Debug` or `Serialize`.
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,
    pub provider: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub status: CredentialStatus,
    pub priority: i32,
    pub rate_limit_per_minute: Option<i32>,
    pub rate_limit_daily: Option<i32>,
    pub usage_today: i64,
    /// Start of the UTC day `usage_today` counts.
    pub usage_today_reset_at: DateTime<Utc>,
    pub usage_this_hour: i64,
    /// Start of the UTC hour `usage_this_hour` counts.
    pub usage_hour_reset_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub consecutive_failures: i32,
    pub max_consecutive_failures: i32,
    pub auto_recover_after_minutes: i32,
    pub total_usage_lifetime: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("status", &self.status)
            .field("priority", &self.priority)
            .field("usage_today", &self.usage_today)
            .field("usage_this_hour", &self.usage_this_hour)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("last_used_at", &self.last_used_at)
            .field("last_failure_at", &self.last_failure_at)
            .finish_non_exhaustive()
    }
}

impl Credential {
    pub fn is_active(&self) -> bool {
        self.status == CredentialStatus::Active
    }

    /// Hourly usage as of `now`: zero once the stored hour has passed.
    pub fn effective_usage_this_hour(&self, now: DateTime<Utc>) -> i64 {
        if hour_window_start(now) > self.usage_hour_reset_at {
            0
        } else {
            self.usage_this_hour
        }
    }

    /// Daily usage as of `now`: zero once the stored day has passed.
    pub fn effective_usage_today(&self, now: DateTime<Utc>) -> i64 {
        if day_window_start(now) > self.usage_today_reset_at {
            0
        } else {
            self.usage_today
        }
    }

    /// Whether a rate-limited credential has served its cool-down at `now`.
    pub fn is_recoverable(&self, now: DateTime<Utc>) -> bool {
        if self.status != CredentialStatus::RateLimited {
            return false;
        }
        match self.last_failure_at {
            Some(limited_at) => {
                now - limited_at >= Duration::minutes(i64::from(self.auto_recover_after_minutes))
            }
            None => true,
        }
    }

    /// Reset counters whose window ended before `now`.
    fn roll_usage_windows(&mut self, now: DateTime<Utc>) {
        let hour = hour_window_start(now);
        if hour > self.usage_hour_reset_at {
            self.usage_this_hour = 0;
            self.usage_hour_reset_at = hour;
        }
        let day = day_window_start(now);
        if day > self.usage_today_reset_at {
            self.usage_today = 0;
            self.usage_today_reset_at = day;
        }
    }

    /// Apply `event` at `now`, returning the status before the event.
    ///
    /// `Disabled` is only left through [`CredentialEvent::Reset`]. A
    /// `Recovered` event on a credential still in its cool-down is a no-op.
    pub fn apply(&mut self, event: CredentialEvent, now: DateTime<Utc>) -> CredentialStatus {
        let previous = self.status;

        match event {
            CredentialEvent::Success => {
                self.roll_usage_windows(now);
                self.usage_this_hour += 1;
                self.usage_today += 1;
                self.total_usage_lifetime += 1;
                self.consecutive_failures = 0;
                self.last_used_at = Some(now);
                self.last_success_at = Some(now);
            }
            CredentialEvent::Failure => {
                self.roll_usage_windows(now);
                self.consecutive_failures += 1;
                self.last_used_at = Some(now);
                self.last_failure_at = Some(now);
                if self.consecutive_failures >= self.max_consecutive_failures {
                    self.status = CredentialStatus::Disabled;
                }
            }
            CredentialEvent::RateLimited => {
                if self.status != CredentialStatus::Disabled {
                    self.status = CredentialStatus::RateLimited;
                }
                self.last_failure_at = Some(now);
            }
            CredentialEvent::Recovered => {
                if self.is_recoverable(now) {
                    self.status = CredentialStatus::Active;
                    self.consecutive_failures = 0;
                }
            }
            CredentialEvent::Reset => {
                self.status = CredentialStatus::Active;
                self.consecutive_failures = 0;
            }
        }

        self.updated_at = now;
        previous
    }
}

/// Result of applying an event in the store.
#[derive(Debug, Clone)]
pub struct EventOutcome {
    pub credential: Credential,
    pub previous_status: CredentialStatus,
}

impl EventOutcome {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.credential.status
    }
}

/// Input model for registering a credential.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredential {
    pub id: Option<String>,
    pub provider: String,
    pub name: String,
    pub secret: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub rate_limit_per_minute: Option<i32>,
    #[serde(default)]
    pub rate_limit_daily: Option<i32>,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: i32,
    #[serde(default = "default_auto_recover_after_minutes")]
    pub auto_recover_after_minutes: i32,
}

fn default_priority() -> i32 {
    DEFAULT_CREDENTIAL_PRIORITY
}

fn default_max_consecutive_failures() -> i32 {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}

fn default_auto_recover_after_minutes() -> i32 {
    DEFAULT_AUTO_RECOVER_AFTER_MINUTES
}

impl fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewCredential")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl NewCredential {
    pub fn new(
        provider: impl Into<String>,
        name: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            provider: provider.into(),
            name: name.into(),
            secret: secret.into(),
            priority: DEFAULT_CREDENTIAL_PRIORITY,
            rate_limit_per_minute: None,
            rate_limit_daily: None,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            auto_recover_after_minutes: DEFAULT_AUTO_RECOVER_AFTER_MINUTES,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(ValidationError::MissingField("provider".to_string()).into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        if self.secret.is_empty() {
            return Err(ValidationError::MissingField("secret".to_string()).into());
        }
        if self.max_consecutive_failures < 1 {
            return Err(ValidationError::InvalidInput(
                "maxConsecutiveFailures must be at least 1".to_string(),
            )
            .into());
        }
        if self.auto_recover_after_minutes < 0 {
            return Err(ValidationError::InvalidInput(
                "autoRecoverAfterMinutes cannot be negative".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Build the stored record: active, zeroed counters, windows starting at `now`.
    pub fn into_credential(self, id: String, now: DateTime<Utc>) -> Credential {
        Credential {
            id,
            provider: self.provider,
            name: self.name,
            secret: self.secret,
            status: CredentialStatus::Active,
            priority: self.priority,
            rate_limit_per_minute: self.rate_limit_per_minute,
            rate_limit_daily: self.rate_limit_daily,
            usage_today: 0,
            usage_today_reset_at: day_window_start(now),
            usage_this_hour: 0,
            usage_hour_reset_at: hour_window_start(now),
            last_used_at: None,
            last_success_at: None,
            last_failure_at: None,
            consecutive_failures: 0,
            max_consecutive_failures: self.max_consecutive_failures,
            auto_recover_after_minutes: self.auto_recover_after_minutes,
            total_usage_lifetime: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn credential(now: DateTime<Utc>) -> Credential {
        NewCredential::new("acme", "primary", "sk-live-123").into_credential("k1".to_string(), now)
    }

    #[test]
    fn test_success_increments_usage_and_clears_failures() {
        let mut c = credential(at(10, 0));
        c.consecutive_failures = 3;

        c.apply(CredentialEvent::Success, at(10, 5));

        assert_eq!(c.usage_this_hour, 1);
        assert_eq!(c.usage_today, 1);
        assert_eq!(c.total_usage_lifetime, 1);
        assert_eq!(c.consecutive_failures, 0);
        assert_eq!(c.last_success_at, Some(at(10, 5)));
        assert_eq!(c.last_used_at, Some(at(10, 5)));
    }

    #[test]
    fn test_hour_rollover_resets_before_increment() {
        let mut c = credential(at(10, 0));
        c.apply(CredentialEvent::Success, at(10, 10));
        c.apply(CredentialEvent::Success, at(10, 20));
        assert_eq!(c.usage_this_hour, 2);

        c.apply(CredentialEvent::Success, at(11, 1));
        assert_eq!(c.usage_this_hour, 1);
        assert_eq!(c.usage_hour_reset_at, at(11, 0));
        assert_eq!(c.usage_today, 3);
        assert_eq!(c.total_usage_lifetime, 3);
    }

    #[test]
    fn test_day_rollover() {
        let mut c = credential(at(23, 0));
        c.apply(CredentialEvent::Success, at(23, 30));
        let next_day = Utc.with_ymd_and_hms(2024, 3, 2, 0, 15, 0).unwrap();

        assert_eq!(c.effective_usage_today(next_day), 0);
        c.apply(CredentialEvent::Success, next_day);
        assert_eq!(c.usage_today, 1);
        assert_eq!(
            c.usage_today_reset_at,
            Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_effective_hourly_usage_after_window() {
        let mut c = credential(at(10, 0));
        c.apply(CredentialEvent::Success, at(10, 30));
        assert_eq!(c.effective_usage_this_hour(at(10, 59)), 1);
        assert_eq!(c.effective_usage_this_hour(at(11, 0)), 0);
    }

    #[test]
    fn test_failures_disable_at_threshold() {
        let mut c = credential(at(10, 0));
        c.max_consecutive_failures = 3;

        c.apply(CredentialEvent::Failure, at(10, 1));
        c.apply(CredentialEvent::Failure, at(10, 2));
        assert_eq!(c.status, CredentialStatus::Active);

        let previous = c.apply(CredentialEvent::Failure, at(10, 3));
        assert_eq!(previous, CredentialStatus::Active);
        assert_eq!(c.status, CredentialStatus::Disabled);
        assert_eq!(c.last_failure_at, Some(at(10, 3)));
    }

    #[test]
    fn test_disabled_is_not_revived_by_automatic_events() {
        let mut c = credential(at(10, 0));
        c.status = CredentialStatus::Disabled;
        c.last_failure_at = Some(at(8, 0));

        c.apply(CredentialEvent::RateLimited, at(10, 1));
        assert_eq!(c.status, CredentialStatus::Disabled);
        c.apply(CredentialEvent::Recovered, at(12, 0));
        assert_eq!(c.status, CredentialStatus::Disabled);
        c.apply(CredentialEvent::Success, at(12, 1));
        assert_eq!(c.status, CredentialStatus::Disabled);

        c.apply(CredentialEvent::Reset, at(12, 2));
        assert_eq!(c.status, CredentialStatus::Active);
        assert_eq!(c.consecutive_failures, 0);
    }

    #[test]
    fn test_recovery_respects_cool_down() {
        let mut c = credential(at(10, 0));
        c.apply(CredentialEvent::RateLimited, at(10, 0));
        assert_eq!(c.status, CredentialStatus::RateLimited);

        assert!(!c.is_recoverable(at(10, 59)));
        c.apply(CredentialEvent::Recovered, at(10, 59));
        assert_eq!(c.status, CredentialStatus::RateLimited);

        assert!(c.is_recoverable(at(11, 0)));
        c.apply(CredentialEvent::Recovered, at(11, 0));
        assert_eq!(c.status, CredentialStatus::Active);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let c = credential(at(10, 0));
        let debug = format!("{:?}", c);
        assert!(!debug.contains("sk-live-123"));
        assert!(debug.contains("<redacted>"));

        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("sk-live-123"));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            CredentialStatus::Active,
            CredentialStatus::RateLimited,
            CredentialStatus::Disabled,
        ] {
            assert_eq!(status.as_str().parse::<CredentialStatus>().unwrap(), status);
        }
        assert!("paused".parse::<CredentialStatus>().is_err());
    }

    #[test]
    fn test_new_credential_validation() {
        assert!(NewCredential::new("acme", "k", "s").validate().is_ok());
        assert!(NewCredential::new("", "k", "s").validate().is_err());
        assert!(NewCredential::new("acme", "k", "").validate().is_err());

        let mut zero_threshold = NewCredential::new("acme", "k", "s");
        zero_threshold.max_consecutive_failures = 0;
        assert!(zero_threshold.validate().is_err());
    }

    #[test]
    fn test_new_credential_defaults_from_json() {
        let new: NewCredential =
            serde_json::from_str(r#"{"provider": "acme", "name": "a", "secret": "s"}"#).unwrap();
        assert_eq!(new.priority, DEFAULT_CREDENTIAL_PRIORITY);
        assert_eq!(new.max_consecutive_failures, DEFAULT_MAX_CONSECUTIVE_FAILURES);
        assert_eq!(new.auto_recover_after_minutes, DEFAULT_AUTO_RECOVER_AFTER_MINUTES);
    }
}
