//! HTTP execution with rate-limit retry and request capture.

mod client;
mod retry;

#[cfg(test)]
pub use client::MockExecute;
pub use client::{Exchange, Execute, HttpClient, REDACTED, RequestDescriptor};
#[cfg(test)]
pub use retry::MockSleeper;
pub use retry::{BACKOFF_BASE_MS, MAX_RETRIES, Sleeper, TokioSleeper, backoff_delay};
