//! Stock rate-limit signal extractors.
//!
//! Providers disagree on how they say "slow down": most answer HTTP 429,
//! some answer 200 with a note in the body (Alpha Vantage), some answer 403
//! once the daily quota is gone (Finnhub). These extractors cover the common
//! shapes; anything more specific implements [`RateLimitSignalExtractor`]
//! next to the provider's payload parsing.

use crate::models::ProviderResponse;

use super::traits::RateLimitSignalExtractor;

const TOO_MANY_REQUESTS: u16 = 429;

/// Fires on HTTP 429.
#[derive(Clone, Debug, Default)]
pub struct StatusCodeSignal;

impl RateLimitSignalExtractor for StatusCodeSignal {
    fn extract_rate_limit_signal(&self, response: &ProviderResponse) -> Option<String> {
        if response.status != TOO_MANY_REQUESTS {
            return None;
        }

        Some(match response.header("retry-after") {
            Some(retry_after) => format!("HTTP 429 (retry after {})", retry_after),
            None => "HTTP 429".to_string(),
        })
    }
}

/// Fires on configured statuses, or when the body contains one of the
/// configured patterns.
#[derive(Clone, Debug)]
pub struct PatternSignal {
    statuses: Vec<u16>,
    patterns: Vec<String>,
}

impl PatternSignal {
    /// Signals on 429 plus any body containing one of `patterns`.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            statuses: vec![TOO_MANY_REQUESTS],
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Also treat `status` as a quota signal (e.g. 403 for daily quota).
    pub fn with_status(mut self, status: u16) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }
}

impl RateLimitSignalExtractor for PatternSignal {
    fn extract_rate_limit_signal(&self, response: &ProviderResponse) -> Option<String> {
        if self.statuses.contains(&response.status) {
            return Some(format!("HTTP {}", response.status));
        }

        self.patterns
            .iter()
            .find(|pattern| response.body.contains(pattern.as_str()))
            .map(|pattern| format!("body matched '{}'", pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_signal_fires_on_429_only() {
        let signal = StatusCodeSignal;
        assert_eq!(
            signal.extract_rate_limit_signal(&ProviderResponse::new(429, "")),
            Some("HTTP 429".to_string())
        );
        assert_eq!(
            signal.extract_rate_limit_signal(&ProviderResponse::new(200, "ok")),
            None
        );
        assert_eq!(
            signal.extract_rate_limit_signal(&ProviderResponse::new(503, "")),
            None
        );
    }

    #[test]
    fn test_status_signal_mentions_retry_after() {
        let response = ProviderResponse::new(429, "").with_header("Retry-After", "60");
        assert_eq!(
            StatusCodeSignal.extract_rate_limit_signal(&response),
            Some("HTTP 429 (retry after 60)".to_string())
        );
    }

    #[test]
    fn test_pattern_signal_matches_body_on_200() {
        let signal = PatternSignal::new(["API call frequency"]);
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}"#;

        assert_eq!(
            signal.extract_rate_limit_signal(&ProviderResponse::new(200, body)),
            Some("body matched 'API call frequency'".to_string())
        );
        assert_eq!(
            signal.extract_rate_limit_signal(&ProviderResponse::new(200, r#"{"price": 1}"#)),
            None
        );
    }

    #[test]
    fn test_pattern_signal_extra_status() {
        let signal = PatternSignal::new(Vec::<String>::new()).with_status(403);
        assert_eq!(
            signal.extract_rate_limit_signal(&ProviderResponse::new(403, "")),
            Some("HTTP 403".to_string())
        );
        assert!(signal
            .extract_rate_limit_signal(&ProviderResponse::new(429, ""))
            .is_some());
    }
}
