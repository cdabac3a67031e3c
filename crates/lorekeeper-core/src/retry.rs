//! Exponential backoff for idempotent upstream reads (§7: base 2s, cap 30s,
//! at most two retries). Reimplemented locally since the upstream crate
//! that provides this in the teacher codebase is not part of this repo's
//! dependency graph; the policy and call shape follow the same pattern.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Error;

/// Retry schedule for a single logical call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn exponential(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }

    /// No retries at all; used for non-idempotent calls such as generation.
    #[must_use]
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(1 << attempt.min(8));
        scaled.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::exponential(2)
    }
}

/// Run `f` under `policy`, retrying only [`Error::UpstreamUnavailable`]
/// failures as the propagation policy in §7 requires.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut f: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(attempt, ?delay, error = %e, "retrying after transient upstream failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
