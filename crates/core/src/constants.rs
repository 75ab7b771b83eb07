/// Default priority for new credentials (lower is preferred)
pub const DEFAULT_CREDENTIAL_PRIORITY: i32 = 50;

/// Consecutive failures after which a credential is disabled
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: i32 = 5;

/// Cool-down before a rate-limited credential is eligible again
pub const DEFAULT_AUTO_RECOVER_AFTER_MINUTES: i32 = 60;

/// Lifetime of a provider's cached best key
pub const DEFAULT_SELECTION_CACHE_TTL_SECS: u64 = 60;

/// Attempts per `execute` call unless the caller says otherwise
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay of the linear retry backoff
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

/// Longest error message stored in the usage log
pub const MAX_LOGGED_ERROR_MESSAGE_LEN: usize = 500;

/// Window of the usage summary attached to health reports
pub const USAGE_SUMMARY_WINDOW_HOURS: i64 = 24;
