use crate::error::{ErrorKind, Result};
use debsnap_config::RetryConfig;
use std::time::{Duration, Instant};

/// Bounded exponential backoff.
///
/// The archive is assumed to come back eventually, so transient failures are
/// retried generously, but never forever: after `max_attempts` attempts, or
/// once the next wait would pass `max_elapsed`, the last error is returned
/// wrapped in [`ErrorKind::RetriesExhausted`]. Errors that are not
/// [retryable](ErrorKind::is_retryable) are returned immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        (&RetryConfig::default()).into()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.initial_backoff(), config.max_backoff(), config.max_elapsed())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration, max_elapsed: Option<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
            max_elapsed,
        }
    }

    /// A policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, None)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before attempt number `attempt + 1`, doubling from the initial
    /// backoff up to the maximum.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, or the policy
    /// runs out. The closure receives the (1-based) attempt number.
    pub fn run<T>(&self, what: &str, mut operation: impl FnMut(u32) -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let mut attempt = 1;
        loop {
            let err = match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };
            let delay = self.delay(attempt);
            let kind: &ErrorKind = &err;
            let out_of_time = self.max_elapsed.is_some_and(|limit| started.elapsed() + delay > limit);
            if attempt >= self.max_attempts || out_of_time {
                tracing::error!(what, attempts = attempt, error = %kind, "Giving up");
                return Err(err.raise(ErrorKind::RetriesExhausted { attempts: attempt }));
            }
            tracing::warn!(what, attempt, delay = ?delay, error = %kind, "Attempt failed; retrying");
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(5, 1_000)]
    #[case(40, 1_000)]
    fn backoff_doubles_up_to_max(#[case] attempt: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_secs(1), None);
        assert_eq!(policy.delay(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let result = RetryPolicy::immediate(5).run("test", |attempt| {
            if attempt < 3 {
                exn::bail!(ErrorKind::Status(503));
            }
            Ok(attempt)
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let err = RetryPolicy::immediate(4)
            .run("test", |_| -> Result<()> {
                calls += 1;
                exn::bail!(ErrorKind::Network("http://example.org".into()))
            })
            .unwrap_err();
        assert_eq!(calls, 4);
        assert!(matches!(*err, ErrorKind::RetriesExhausted { attempts: 4 }));
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut calls = 0;
        let err = RetryPolicy::immediate(4)
            .run("test", |_| -> Result<()> {
                calls += 1;
                exn::bail!(ErrorKind::Status(404))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(*err, ErrorKind::Status(404)));
    }

    #[test]
    fn elapsed_budget_stops_early() {
        let policy = RetryPolicy::new(100, Duration::from_secs(60), Duration::from_secs(60), Some(Duration::from_secs(1)));
        let mut calls = 0;
        let err = policy
            .run("test", |_| -> Result<()> {
                calls += 1;
                exn::bail!(ErrorKind::Status(500))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(*err, ErrorKind::RetriesExhausted { attempts: 1 }));
    }

    #[test]
    fn from_config() {
        let policy = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(policy.max_attempts(), 10);
        assert_eq!(policy.delay(1), Duration::from_secs(1));
    }
}
