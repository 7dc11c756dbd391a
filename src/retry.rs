//! Bounded retry with a fixed delay
//!
//! Every blocking call to an external collaborator (registry lookups,
//! release-list lookups, publishing, dependency installs) goes through
//! [`with_retry`] or [`with_retry_if`]. Attempts and delay are fixed; there
//! is no jitter and no growth of the delay between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default number of attempts for external calls
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Default delay between two attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Attempt count and delay for one retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (at least 1)
    pub attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; zero attempts is treated as one
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A policy that runs the operation exactly once
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// The closure receives the 1-based attempt number. The last error is
/// returned when every attempt failed.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(policy, |_| true, operation).await
}

/// Like [`with_retry`], but errors for which `should_retry` returns false
/// are returned immediately.
pub async fn with_retry_if<T, E, P, F, Fut>(
    policy: RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    P: Fn(&E) -> bool,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts && should_retry(&error) => {
                warn!(attempt, attempts, %error, "attempt failed, retrying");
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
