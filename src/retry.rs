//! Bounded retry with exponential backoff for external calls

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Errors that may succeed when the same call is repeated
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Retry policy applied at every storage and model boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: usize,
    /// First backoff step; doubles per retry
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff step
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts including the first one
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        // from_millis(2) with factor f yields 2f, 4f, 8f, ...
        ExponentialBackoff::from_millis(2)
            .factor((self.base_delay_ms / 2).max(1))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .map(jitter)
            .take(self.max_retries)
    }

    /// Run `op`, repeating it while it fails with a transient error.
    ///
    /// Returns the last error once the retry budget is spent; the caller
    /// decides how to report exhaustion.
    pub async fn run<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        RetryIf::spawn(self.strategy(), op, |e: &E| {
            let transient = e.is_transient();
            if transient {
                warn!(call = what, error = %e, "Transient failure, retrying");
            }
            transient
        })
        .await
    }
}
