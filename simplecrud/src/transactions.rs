//! Transactions retried on serialization failure.
//!
//! CockroachDB runs every transaction at `SERIALIZABLE` isolation and aborts one side of a
//! conflict with SQLSTATE `40001`. The client is expected to run the whole transaction again.
//! [`run_transaction`] does that: each attempt gets a fresh transaction, a serialization failure
//! from the operation or from `COMMIT` rolls back, sleeps with exponential backoff and retries.
//! Any other error rolls back and is returned as is.

use crate::config::RetryConfig;
use crate::errors::{Error, Result};
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub jitter: bool,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            base_backoff: config.base_backoff,
            jitter: config.jitter,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Sleep before retrying after failed attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = if self.jitter { rand::random::<f64>() + 0.5 } else { 1.0 };
        self.backoff_with_factor(attempt, factor)
    }

    /// `base_backoff * 2^attempt * factor`
    fn backoff_with_factor(&self, attempt: u32, factor: f64) -> Duration {
        let exponential = self.base_backoff.saturating_mul(2u32.saturating_pow(attempt));
        Duration::try_from_secs_f64(exponential.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

/// Execute `op` inside a transaction, retrying serialization failures.
///
/// The transaction commits if `op` returns `Ok`, and rolls back otherwise. After
/// `policy.max_retries` failed attempts the result is [`Error::RetriesExhausted`].
pub async fn run_transaction<T, F>(pool: &PgPool, policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: AsyncFnMut(&mut PgConnection) -> Result<T>,
{
    for attempt in 1..=policy.max_retries {
        let mut tx = pool.begin().await?;

        let outcome = match op(&mut *tx).await {
            Ok(value) => tx.commit().await.map(|_| value).map_err(Error::from),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                debug!(attempt, max_retries = policy.max_retries, error = %e, "Transaction hit a serialization failure");
                if attempt < policy.max_retries {
                    let sleep = policy.backoff(attempt);
                    debug!(sleep_ms = sleep.as_millis() as u64, "Sleeping before retry");
                    tokio::time::sleep(sleep).await;
                }
            }
            Err(e) => {
                debug!(attempt, error = %e, "Transaction failed with a non-retryable error");
                return Err(e);
            }
        }
    }

    Err(Error::RetriesExhausted {
        max_retries: policy.max_retries,
    })
}
