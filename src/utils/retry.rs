//! Bounded retry with exponential backoff
//!
//! Used by network drivers to absorb one-off connection hiccups. Retries are
//! bounded and only taken when the caller classifies the error as transient,
//! so a hard failure still surfaces within the request deadline.

use std::future::Future;
use std::time::Duration;

/// Run `operation` up to `max_attempts` times, sleeping with exponential
/// backoff between attempts. `is_transient` decides whether an error is worth
/// retrying; a non-transient error is returned immediately.
pub async fn with_backoff<T, E, F, Fut, P>(
    max_attempts: u32,
    base_delay_ms: u64,
    is_transient: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempts >= max_attempts || !is_transient(&e) {
                    return Err(e);
                }
                let delay = Duration::from_millis(base_delay_ms * 2_u64.pow(attempts - 1));
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient backend error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
