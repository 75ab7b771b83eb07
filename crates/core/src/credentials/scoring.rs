//! Selection score for credentials.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::credentials_model::Credential;
use crate::utils::time_utils::minutes_between;

/// Weights of the selection score
///
/// `score = (priority_base - priority) * priority_weight
///        - effective_usage_this_hour * hourly_usage_weight
///        - max(0, recency_window_minutes - minutes_since_last_use) * recency_weight`
///
/// The recency term is zero for a credential that was never used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionWeights {
    pub priority_base: f64,
    pub priority_weight: f64,
    pub hourly_usage_weight: f64,
    pub recency_window_minutes: f64,
    pub recency_weight: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            priority_base: 100.0,
            priority_weight: 10.0,
            hourly_usage_weight: 2.0,
            recency_window_minutes: 10.0,
            recency_weight: 5.0,
        }
    }
}

impl SelectionWeights {
    pub fn score(&self, credential: &Credential, now: DateTime<Utc>) -> f64 {
        let priority = (self.priority_base - f64::from(credential.priority)) * self.priority_weight;
        let usage = credential.effective_usage_this_hour(now) as f64 * self.hourly_usage_weight;
        priority - usage - self.recency_penalty(credential, now)
    }

    fn recency_penalty(&self, credential: &Credential, now: DateTime<Utc>) -> f64 {
        match credential.last_used_at {
            // Clock skew can put last use in the future; treat as "just used".
            Some(last_used) => {
                let idle = minutes_between(last_used, now).max(0.0);
                (self.recency_window_minutes - idle).max(0.0) * self.recency_weight
            }
            None => 0.0,
        }
    }

    /// Index of the highest-scoring credential; the first one wins ties.
    pub fn pick_best(&self, candidates: &[Credential], now: DateTime<Utc>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            let score = self.score(candidate, now);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }
        best.map(|(index, _)| index)
    }
}
