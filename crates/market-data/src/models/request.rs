use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP method of an outbound provider call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(format!("Unsupported HTTP method: {}", other)),
        }
    }
}

/// A single outbound call, before a credential is attached.
///
/// Parameters are kept ordered so that the usage log and the wire request
/// see them in the same order.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderRequest {
    /// Path relative to the provider's base URL (e.g. `/quote`).
    pub endpoint: String,
    pub method: HttpMethod,
    /// Query parameters for GET, JSON body fields for POST.
    pub params: BTreeMap<String, String>,
    /// Upper bound for the whole call, connection included.
    pub timeout: Duration,
}

impl ProviderRequest {
    pub fn get(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: HttpMethod::Get,
            params: BTreeMap::new(),
            timeout,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parameters as a JSON object, for logging.
    pub fn params_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.params
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}
