//! Retry and polling helpers
//!
//! `retry_with_backoff` retries transient ledger RPC failures with exponential
//! backoff and jitter. `poll_fixed` repeats a lookup that may legitimately find
//! nothing yet, waiting a fixed delay between attempts.

use std::time::Duration;

use crate::config::{PollConfig, RetryConfig};
use crate::error::{Error, Result};

/// Retry a fallible async operation with exponential backoff
///
/// # Example
/// ```ignore
/// let height = retry_with_backoff(
///     &config,
///     || async { rpc.block_number().await },
///     is_retryable_error,
/// ).await?;
/// ```
pub async fn retry_with_backoff<T, F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
    is_retryable: R,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    R: Fn(&Error) -> bool,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_attempts || !is_retryable(&e) {
                    return Err(e);
                }

                let backoff = calculate_backoff(config, attempt);
                tracing::debug!(
                    attempt = attempt,
                    backoff_ms = backoff.as_millis(),
                    error = %e,
                    "Retrying ledger request after transient error"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Repeat `lookup` until it yields a value or the attempts run out
///
/// `Ok(None)` means "not there yet" and triggers another attempt after
/// `config.delay`. An error ends polling immediately and is reported as
/// `None`; callers of this helper treat absence and failure alike.
pub async fn poll_fixed<T, F, Fut>(config: &PollConfig, mut lookup: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=config.attempts {
        match lookup(attempt).await {
            Ok(Some(found)) => return Some(found),
            Ok(None) if attempt < config.attempts => {
                tracing::debug!(
                    attempt = attempt,
                    delay_ms = config.delay().as_millis(),
                    "Nothing found yet, polling again"
                );
                tokio::time::sleep(config.delay()).await;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(attempt = attempt, error = %e, "Polling aborted");
                return None;
            }
        }
    }
    None
}

/// Calculate backoff duration with jitter
fn calculate_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    // initial * 2^(attempt-1)
    let base_ms = config
        .initial_backoff_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped_ms = base_ms.min(config.max_backoff_ms);

    let jitter_ms = rand_jitter(capped_ms);
    Duration::from_millis(capped_ms.saturating_add(jitter_ms))
}

/// Pseudo-random jitter in `0..max` taken from the clock
fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    nanos % max.max(1)
}

/// Check if a ledger error is transient and worth retrying
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Network(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout")
                || msg_lower.contains("timed out")
                || msg_lower.contains("connection reset")
                || msg_lower.contains("connection refused")
                || msg_lower.contains("503")
                || msg_lower.contains("service unavailable")
                || msg_lower.contains("too many requests")
                || msg_lower.contains("429")
        }
        Error::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
        ),
        // -32005 is the conventional "limit exceeded" code for rate limiting nodes
        Error::Rpc { code, .. } => *code == -32005,
        _ => false,
    }
}
