//! Database retry logic
//!
//! Bounded backoff for transient SQLite lock errors.

use std::time::{Duration, Instant};

use crate::{Error, Result};

const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(1000);

/// Run `operation`, retrying "database is locked" failures until `max_wait_ms` passes
///
/// Sleeps between attempts, starting at 10ms and doubling up to 1s, never past
/// the deadline. Any other error is returned from the attempt that raised it.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let deadline = Instant::now() + Duration::from_millis(max_wait_ms);
    let mut backoff = INITIAL_BACKOFF;
    let mut locked_attempts = 0u32;

    let last_err = loop {
        let err = match operation().await {
            Ok(value) => {
                if locked_attempts > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        locked_attempts,
                        "Database lock cleared"
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_lock_error() => err,
            Err(err) => return Err(err),
        };

        locked_attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break err;
        }

        let pause = backoff.min(remaining);
        tracing::warn!(
            operation = operation_name,
            locked_attempts,
            pause_ms = pause.as_millis() as u64,
            "Database locked, retrying"
        );
        tokio::time::sleep(pause).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    };

    tracing::error!(
        operation = operation_name,
        locked_attempts,
        max_wait_ms,
        error = %last_err,
        "Giving up on locked database"
    );
    Err(Error::Internal(format!(
        "Database locked: {} gave up after {} attempts in {} ms",
        operation_name, locked_attempts, max_wait_ms
    )))
}
