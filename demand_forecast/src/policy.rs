//! Timeout, retry and fallback around upstream calls
//!
//! The forecasting math never retries. This policy sits between the engine
//! and its data sources and turns an exhausted upstream into either an
//! explicit fallback value or an `UpstreamUnavailable` error.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Bounded retry policy for a single async request/response call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Per-attempt time budget
    pub timeout_ms: u64,
    /// Extra attempts after the first
    pub retries: u32,
    /// Fixed wait between attempts
    pub backoff_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            retries: 1,
            backoff_ms: 500,
        }
    }
}

/// Value produced by [`FetchPolicy::fetch`]
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// The upstream answered
    Fresh(T),
    /// Every attempt failed and the documented fallback was substituted
    Fallback { value: T, reason: String },
}

impl<T> FetchOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FetchOutcome::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fresh(_) => None,
            FetchOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            FetchOutcome::Fresh(value) | FetchOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            FetchOutcome::Fresh(value) | FetchOutcome::Fallback { value, .. } => value,
        }
    }
}

impl FetchPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Run `call` under the policy, failing with `UpstreamUnavailable` once
    /// every attempt has failed or timed out
    pub async fn attempt<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let error = match tokio::time::timeout(self.timeout(), call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => ForecastError::Timeout(self.timeout()),
            };
            log::warn!("{label}: attempt {attempt}/{attempts} failed: {error}");
            last_error = error.to_string();

            if attempt < attempts {
                tokio::time::sleep(self.backoff()).await;
            }
        }

        Err(ForecastError::UpstreamUnavailable(format!(
            "{label} failed after {attempts} attempt(s): {last_error}"
        )))
    }

    /// Run `call` under the policy, substituting `fallback` on exhaustion
    pub async fn fetch<T, F, Fut>(&self, label: &str, call: F, fallback: T) -> FetchOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.attempt(label, call).await {
            Ok(value) => FetchOutcome::Fresh(value),
            Err(e) => {
                log::warn!("{label}: using fallback value: {e}");
                FetchOutcome::Fallback {
                    value: fallback,
                    reason: e.to_string(),
                }
            }
        }
    }
}
