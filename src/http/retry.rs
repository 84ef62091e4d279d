//! Backoff schedule for rate-limited requests.

use async_trait::async_trait;
use std::time::Duration;

/// Maximum number of retries after a rate-limited response.
pub const MAX_RETRIES: u32 = 3;

/// Base unit for the exponential backoff in milliseconds.
pub const BACKOFF_BASE_MS: u64 = 1000;

/// Delay before the next attempt, given how many retries are still available.
///
/// `2^(4 - retries_remaining) * 1000` ms: 2s, then 4s, then 8s.
pub fn backoff_delay(retries_remaining: u32) -> Duration {
    let exponent = (MAX_RETRIES + 1).saturating_sub(retries_remaining);
    Duration::from_millis(2u64.pow(exponent) * BACKOFF_BASE_MS)
}

/// Suspends the current task between retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
