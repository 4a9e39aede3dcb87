//! # Busy Retry
//!
//! Re-runs a whole ledger operation when the store reports lock contention.
//!
//! Each attempt opens a fresh unit, so a retried operation never observes a
//! half-applied predecessor. Only [`LedgerError::Busy`] is retried; business
//! rule failures return immediately.
//!
//! ```text
//! attempt 1 ──Busy──► sleep 1×backoff ──► attempt 2 ──Busy──► sleep 2×backoff
//!                                                     ...
//! attempt N+1 ──Busy──► Err(Busy)   (N = max_retries)
//! ```

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::LedgerResult;

#[cfg(doc)]
use crate::error::LedgerError;

/// Linear backoff policy for `Busy` failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        RetryPolicy { max_retries, backoff }
    }

    /// Fail on the first `Busy`.
    pub fn none() -> Self {
        RetryPolicy::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, Duration::from_millis(50))
    }
}

/// Runs `op`, retrying it while it fails with a retryable error.
pub async fn with_busy_retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut op: F) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff * attempt;
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Store busy, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
