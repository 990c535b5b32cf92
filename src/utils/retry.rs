// src/utils/retry.rs

//! Bounded retry for flaky collaborators.
//!
//! The same policy covers publish invocations and provider lookups: a fixed
//! number of total attempts, stopping at the first success.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::DeliveryConfig;

/// Fixed attempt budget with an optional pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

/// Final result of a retried operation and how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub attempts: u32,
    pub result: Result<T>,
}

/// Run `op` until it succeeds or the budget is spent.
///
/// Failed attempts are logged at debug with `label`; the last error is
/// returned to the caller.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                return Attempted {
                    attempts,
                    result: Ok(value),
                };
            }
            Err(error) if attempts < policy.max_attempts => {
                log::debug!(
                    "{} failed (attempt {}/{}): {}",
                    label,
                    attempts,
                    policy.max_attempts,
                    error
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(error) => {
                return Attempted {
                    attempts,
                    result: Err(error),
                };
            }
        }
    }
}
