//! Per-call timeout and retry for log operations.
//!
//! Only the call that failed is retried; completed appends are never
//! repeated by a later failure in the same operation.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use provenance_kernel_log::LogError;

use crate::config::RetryPolicy;

pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    op: &'static str,
    mut call: F,
) -> Result<T, LogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LogError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(LogError::Timeout(timeout)),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(op, attempt, error = %e, ?delay, "transient log error, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
