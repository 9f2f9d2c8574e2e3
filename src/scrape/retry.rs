//! Shared retry policy for outbound requests.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{RankingsError, Result};

/// Fixed-backoff retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay between attempts
    pub backoff: Duration,
    /// Decides whether an error is worth another attempt
    pub retryable: fn(&RankingsError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            retryable: RankingsError::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff(),
            ..Self::default()
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}/{}", what, attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && (self.retryable)(&e) => {
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, max_attempts, e, self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("{} failed after {} attempt(s): {}", what, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    fn server_error() -> RankingsError {
        RankingsError::Status {
            url: "https://example.test/1".into(),
            status: 502,
        }
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast_policy()
            .run("team 1", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(server_error()) }
            })
            .await;

        assert!(matches!(result, Err(RankingsError::Status { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_on_later_attempt() {
        let result = fast_policy()
            .run("team 2", |attempt| async move {
                if attempt < 3 {
                    Err(server_error())
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_login_redirect_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast_policy()
            .run("team 3", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(RankingsError::LoginRedirect {
                        url: "https://login.example.test/".into(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(RankingsError::LoginRedirect { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
