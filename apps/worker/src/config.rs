//! Worker configuration, read from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use keyrelay_core::constants::DEFAULT_SELECTION_CACHE_TTL_SECS;
use keyrelay_core::credentials::NewCredential;
use keyrelay_market_data::provider::ProviderConfig;
use serde::Deserialize;

const DEFAULT_DB_PATH: &str = "./data/keyrelay.db";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_HEALTH_REPORT_INTERVAL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// JSON list of [`ProviderFileEntry`].
    pub providers_file: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub health_report_interval: Duration,
    pub selection_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            db_path: std::env::var("KR_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            providers_file: std::env::var("KR_PROVIDERS_FILE").ok().map(PathBuf::from),
            sweep_interval: env_interval("KR_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
            health_report_interval: env_interval(
                "KR_HEALTH_REPORT_INTERVAL_SECS",
                DEFAULT_HEALTH_REPORT_INTERVAL_SECS,
            )?,
            selection_cache_ttl_secs: env_u64(
                "KR_SELECTION_CACHE_TTL_SECS",
                DEFAULT_SELECTION_CACHE_TTL_SECS,
            )?,
        })
    }
}

fn env_u64(key: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(key) {
        Ok(raw) => parse_u64(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_u64(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'"))
}

fn env_interval(key: &str, default_secs: u64) -> anyhow::Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => parse_interval(key, &raw),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

/// Scheduler periods; `tokio::time::interval` rejects a zero period.
fn parse_interval(key: &str, raw: &str) -> anyhow::Result<Duration> {
    let secs = parse_u64(key, raw)?;
    anyhow::ensure!(secs > 0, "{key} must be at least 1 second, got '{raw}'");
    Ok(Duration::from_secs(secs))
}

/// One provider in the providers file, with optional bootstrap keys.
///
/// ```json
/// [{
///   "name": "finnhub",
///   "base_url": "https://finnhub.io/api/v1",
///   "api_key": { "type": "header", "name": "X-Finnhub-Token" },
///   "credentials": [{ "name": "primary", "secret": "...", "priority": 10 }]
/// }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderFileEntry {
    #[serde(flatten)]
    pub config: ProviderConfig,
    #[serde(default)]
    pub credentials: Vec<BootstrapCredential>,
}

/// A credential listed under its provider; the provider name is implied.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapCredential {
    pub name: String,
    pub secret: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub rate_limit_per_minute: Option<i32>,
    #[serde(default)]
    pub rate_limit_daily: Option<i32>,
}

impl std::fmt::Debug for BootstrapCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapCredential")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("priority", &self.priority)
            .finish()
    }
}

impl BootstrapCredential {
    pub fn into_new_credential(self, provider: &str) -> NewCredential {
        let mut new = NewCredential::new(provider, self.name, self.secret);
        if let Some(priority) = self.priority {
            new = new.with_priority(priority);
        }
        new.rate_limit_per_minute = self.rate_limit_per_minute;
        new.rate_limit_daily = self.rate_limit_daily;
        new
    }
}

pub fn load_providers_file(path: &Path) -> anyhow::Result<Vec<ProviderFileEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading providers file {}", path.display()))?;
    parse_providers(&raw).with_context(|| format!("parsing providers file {}", path.display()))
}

fn parse_providers(raw: &str) -> anyhow::Result<Vec<ProviderFileEntry>> {
    Ok(serde_json::from_str(raw)?)
}
