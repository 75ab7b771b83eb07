use std::collections::HashMap;

use crate::errors::ProviderError;

/// Maximum number of body characters copied into an error message.
const ERROR_BODY_EXCERPT: usize = 200;

/// A provider response as seen by the rate-limit hook and the caller.
///
/// The body is kept opaque; payload parsing belongs to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into a [`ProviderError::Http`].
    pub fn error_for_status(self, provider: &str) -> Result<Self, ProviderError> {
        if self.is_success() {
            return Ok(self);
        }

        let message: String = self.body.chars().take(ERROR_BODY_EXCERPT).collect();
        Err(ProviderError::Http {
            provider: provider.to_string(),
            status: self.status,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status_passes_success() {
        let response = ProviderResponse::new(200, "{}");
        assert!(response.error_for_status("fmp").is_ok());
    }

    #[test]
    fn test_error_for_status_truncates_body() {
        let body = "x".repeat(1000);
        let err = ProviderResponse::new(502, body)
            .error_for_status("fmp")
            .unwrap_err();

        match err {
            ProviderError::Http {
                status, message, ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), ERROR_BODY_EXCERPT);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = ProviderResponse::new(429, "").with_header("Retry-After", "30");
        assert_eq!(response.header("retry-after"), Some("30"));
        assert_eq!(response.header("RETRY-AFTER"), Some("30"));
    }
}
