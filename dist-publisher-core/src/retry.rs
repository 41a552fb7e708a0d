//! Bounded retry with exponential backoff for storage calls.

use std::future::Future;

use tracing::warn;

use crate::config::RetrySettings;
use crate::error::StorageError;

/// Run `op` until it succeeds, fails permanently, or `max_attempts` is reached.
///
/// Only [`StorageError::Transient`] failures are retried.
pub async fn with_retry<T, F, Fut>(
    settings: &RetrySettings,
    operation: &str,
    mut op: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let max_attempts = settings.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = settings.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient storage error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
