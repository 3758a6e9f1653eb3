//! Retry utilities with increasing backoff.
//!
//! The delay after attempt `k` is `base_delay * k`, so successive waits are
//! strictly increasing for any non-zero base. Waits are cut short by the
//! cancellation signal when one is attached.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Multiplied by the attempt number to get the next delay.
    pub base_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
    /// Stops further attempts and interrupts backoff sleeps.
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            operation_name: "operation".to_string(),
            cancel_rx: None,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Attach a cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Delay inserted after `attempt` (1-based) fails.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// True once the attached cancellation signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sleep for `delay`, returning `false` if cancelled first.
    async fn backoff(&self, delay: Duration) -> bool {
        let Some(mut rx) = self.cancel_rx.clone() else {
            tokio::time::sleep(delay).await;
            return true;
        };

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            if *rx.borrow_and_update() {
                return false;
            }
            tokio::select! {
                _ = &mut sleep => return true,
                changed = rx.changed() => {
                    if changed.is_err() {
                        sleep.await;
                        return true;
                    }
                }
            }
        }
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded on attempt `attempts`.
    Success { value: T, attempts: u32 },
    /// Operation failed and no further attempt was allowed.
    Failed { error: E, attempts: u32 },
    /// Cancellation stopped the loop; `error` is the last failure seen.
    Interrupted { error: Option<E>, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    /// Number of attempts that were started.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. }
            | RetryResult::Failed { attempts, .. }
            | RetryResult::Interrupted { attempts, .. } => *attempts,
        }
    }
}

/// Execute an async operation with retry logic.
///
/// `operation` receives the 1-based attempt number. `should_retry` can veto
/// a retry for errors that cannot succeed on a later attempt.
///
/// # Example
/// ```ignore
/// let config = RetryConfig::new("acquire").with_max_attempts(3);
/// let result = retry_async(&config, |_| true, |attempt| async move {
///     fetch(attempt).await
/// }).await;
/// ```
pub async fn retry_async<F, Fut, T, E, P>(
    config: &RetryConfig,
    should_retry: P,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    let mut last_error = None;

    loop {
        if config.is_cancelled() {
            return RetryResult::Interrupted {
                error: last_error,
                attempts: attempt,
            };
        }

        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) if attempt < config.max_attempts && should_retry(&e) => {
                let delay = config.delay_for_attempt(attempt);
                debug!(
                    "{} attempt {}/{} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, config.max_attempts, delay, e
                );
                last_error = Some(e);
                if !config.backoff(delay).await {
                    return RetryResult::Interrupted {
                        error: last_error,
                        attempts: attempt,
                    };
                }
            }
            Err(e) => {
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt,
                }
            }
        }
    }
}
