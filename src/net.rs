//! Shared retry/backoff loop for the embedding, financial-data, and LLM
//! HTTP clients.
//!
//! Each client classifies its own failures (what counts as retryable is
//! domain-specific — a financial-data 404 is a "not found", an embedding
//! 404 is fatal); this module only owns the backoff loop itself, mirroring
//! the response-classification shape used by the pack's HTTP client
//! helpers (429/5xx/timeout retried, 4xx surfaced immediately).

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// The outcome of classifying one attempt's failure.
pub enum Classified<E> {
    /// Worth retrying (timeout, 429, 5xx).
    Retry(E),
    /// Not worth retrying (4xx, protocol violation, decode failure).
    Fatal(E),
}

/// The error side of [`retry_with_backoff`]'s result: the last failure seen
/// and how many attempts were actually made.
///
/// Callers use `attempts` to decide whether the failure represents a
/// single fatal error (`attempts == 1`) or retries actually exhausted
/// (`attempts > 1`), and surface the latter as a `RetriesExhausted` error.
pub struct Exhausted<E> {
    /// The last observed error.
    pub error: E,
    /// Number of attempts made before giving up.
    pub attempts: u32,
}

/// Runs `attempt` up to `policy.max_attempts` times with exponential
/// backoff between retryable failures.
///
/// `attempt` receives the 1-based attempt number. On a [`Classified::Fatal`]
/// failure the error is returned immediately; on [`Classified::Retry`] the
/// loop sleeps and tries again until attempts are exhausted, at which point
/// the last retryable error is returned alongside the attempt count.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryConfig,
    mut attempt: F,
) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Classified<E>>>,
{
    let mut backoff_ms = policy.initial_backoff_ms;
    let mut attempt_num = 1u32;

    loop {
        match attempt(attempt_num).await {
            Ok(value) => return Ok(value),
            Err(Classified::Fatal(error)) => {
                return Err(Exhausted {
                    error,
                    attempts: attempt_num,
                });
            }
            Err(Classified::Retry(error)) => {
                if attempt_num >= policy.max_attempts {
                    return Err(Exhausted {
                        error,
                        attempts: attempt_num,
                    });
                }
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(policy.max_backoff_ms);
                attempt_num += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retry_succeeds_eventually() {
        let policy = RetryConfig {
            max_attempts: 5,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        };
        let mut calls = 0u32;
        let result: Result<u32, Exhausted<&str>> = retry_with_backoff(&policy, |attempt| {
            calls += 1;
            async move {
                if attempt < 3 {
                    Err(Classified::Retry("not yet"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.ok(), Some(3));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_fatal_stops_immediately() {
        let policy = RetryConfig {
            max_attempts: 5,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        };
        let mut calls = 0u32;
        let result: Result<u32, Exhausted<&str>> = retry_with_backoff(&policy, |_| {
            calls += 1;
            async move { Err(Classified::Fatal("bad request")) }
        })
        .await;
        let err = result.err().unwrap();
        assert_eq!(err.error, "bad request");
        assert_eq!(err.attempts, 1);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let policy = RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        };
        let mut calls = 0u32;
        let result: Result<u32, Exhausted<&str>> = retry_with_backoff(&policy, |_| {
            calls += 1;
            async move { Err(Classified::Retry("timeout")) }
        })
        .await;
        let err = result.err().unwrap();
        assert_eq!(err.error, "timeout");
        assert_eq!(err.attempts, 2);
        assert_eq!(calls, 2);
    }
}
