//! Usage log domain models.

use chrono::{DateTime, Utc};
use keyrelay_market_data::{HttpMethod, ProviderError, ProviderRequest};
use serde::{Deserialize, Serialize};

/// One immutable row of the usage log: a single call attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
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
    /// Request parameters as a JSON object.
    pub request_params: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the orchestrator knows about a finished attempt.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub endpoint: String,
    pub method: HttpMethod,
    pub success: bool,
    pub status_code: Option<u16>,
    pub elapsed_ms: u64,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub params: serde_json::Value,
}

impl CallRecord {
    pub fn success(request: &ProviderRequest, status_code: u16, elapsed_ms: u64) -> Self {
        Self {
            endpoint: request.endpoint.clone(),
            method: request.method,
            success: true,
            status_code: Some(status_code),
            elapsed_ms,
            error_type: None,
            error_message: None,
            params: request.params_json(),
        }
    }

    pub fn failure(request: &ProviderRequest, error: &ProviderError, elapsed_ms: u64) -> Self {
        Self {
            endpoint: request.endpoint.clone(),
            method: request.method,
            success: false,
            status_code: error.status_code(),
            elapsed_ms,
            error_type: Some(error.error_type().to_string()),
            error_message: Some(error.to_string()),
            params: request.params_json(),
        }
    }
}

/// Aggregate of a credential's recent usage log rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub requests: i64,
    pub failures: i64,
    pub rate_limit_hits: i64,
    pub avg_response_time_ms: Option<f64>,
}
