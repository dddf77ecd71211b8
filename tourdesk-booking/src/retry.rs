use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{AttemptError, BookingError};

/// How often a whole transactional attempt is replayed after a transient
/// store conflict.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(25))
    }
}

/// Run `attempt` until it succeeds, is rejected, or the policy runs out.
///
/// Each attempt owns its transaction, so a failed attempt has already rolled
/// back by the time it is replayed.
pub(crate) async fn run<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut attempt: F) -> Result<T, BookingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Ok(value) => {
                if n > 1 {
                    debug!("{} succeeded on attempt {}", operation, n);
                }
                return Ok(value);
            }
            Err(AttemptError::Rejected(err)) => return Err(err),
            Err(AttemptError::Store(err)) if err.is_retryable() => {
                warn!("{} attempt {}/{} hit a transient conflict: {}", operation, n, policy.max_attempts, err);
                if n < policy.max_attempts {
                    tokio::time::sleep(policy.backoff * n).await;
                }
            }
            Err(AttemptError::Store(err)) => {
                error!("{} failed: {}", operation, err);
                return Err(BookingError::Unexpected(err.to_string()));
            }
        }
    }

    Err(BookingError::TransactionConflict {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tourdesk_core::StoreError;

    fn quick() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_conflict_is_retried_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = run(&quick(), "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AttemptError::Store(StoreError::Conflict("40001".into())))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_transaction_conflict() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run(&quick(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::Store(StoreError::Conflict("40001".into())))
        })
        .await;

        assert!(matches!(result, Err(BookingError::TransactionConflict { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejections_and_database_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run(&quick(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::Rejected(BookingError::Unauthorized))
        })
        .await;
        assert!(matches!(result, Err(BookingError::Unauthorized)));

        let result: Result<(), _> = run(&quick(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::Store(StoreError::Database("connection refused".into())))
        })
        .await;
        assert!(matches!(result, Err(BookingError::Unexpected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
