use std::future::Future;
use std::time::Duration;

/// Retry an async operation with exponential backoff.
///
/// Only errors for which `is_transient` returns true are retried; anything
/// else is returned immediately.
///
/// # Arguments
/// * `f` - Produces a fresh attempt each time it is called
/// * `max_attempts` - Total attempts including the first one (0 behaves as 1)
/// * `base_delay_ms` - Initial delay in milliseconds (doubles each retry)
/// * `operation_name` - Human-readable name for logging
/// * `is_transient` - Decides whether an error is worth another attempt
pub async fn retry_with_backoff_async<F, Fut, T, E, P>(
    mut f: F,
    max_attempts: u32,
    base_delay_ms: u64,
    operation_name: &str,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < max_attempts && is_transient(&e) => {
                let delay_ms = base_delay_ms.saturating_mul(2_u64.saturating_pow(attempt));
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms...",
                    operation_name,
                    attempt + 1,
                    max_attempts,
                    e,
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    "{} failed after {} attempt(s): {}",
                    operation_name,
                    attempt + 1,
                    e
                );
                return Err(e);
            }
        }
    }
}
