//! Bounded polling.
//!
//! Every wait in the crate goes through one of the two loops below. They
//! are the only places that sleep; everything else either calls the driver
//! once or is built on these.

pub mod conditions;

use crate::core::WaitConfig;
use crate::errors::{BrowserError, ErrorKind, Result};
use std::future::Future;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub use conditions::{
    clickable, new_window_after, presence_of, staleness_of, until_clickable, until_present,
    until_stale,
};

/// Poll `condition` until it yields `Some`, or fail with `Timeout`.
///
/// `Ok(None)` means "not yet". An `Err` from the condition is not a
/// "not yet": it propagates immediately.
pub async fn wait_until<T, F, Fut>(
    config: WaitConfig,
    description: &str,
    mut condition: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let timeout = config.timeout();
    let poll_interval = config.poll_interval();
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = condition().await? {
            debug!(condition = description, attempts, "wait satisfied");
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            debug!(condition = description, attempts, ?elapsed, "wait timed out");
            return Err(BrowserError::Timeout {
                condition: description.to_string(),
                timeout,
            });
        }

        sleep(poll_interval.min(timeout - elapsed)).await;
    }
}

/// Retry `action` while it fails with an error of kind `retry_on`.
///
/// The first success is returned. Errors of any other kind propagate
/// unchanged; if the deadline passes while still failing with `retry_on`,
/// the last failure is wrapped in `RetryExhausted`.
pub async fn wait_until_ok<T, F, Fut>(
    config: WaitConfig,
    operation: &str,
    retry_on: ErrorKind,
    mut action: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let timeout = config.timeout();
    let poll_interval = config.poll_interval();
    let start = Instant::now();

    loop {
        let err = match action().await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind() == retry_on => err,
            Err(err) => return Err(err),
        };

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(BrowserError::RetryExhausted {
                operation: operation.to_string(),
                kind: retry_on,
                timeout,
                source: Box::new(err),
            });
        }

        debug!(operation, error = %err, "retrying");
        sleep(poll_interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config(timeout_ms: u64, poll_ms: u64) -> WaitConfig {
        WaitConfig::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_ms),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_returns_first_some() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = wait_until(config(5_000, 500), "third call", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n == 3).then_some(n))
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_times_out_at_deadline_not_before() {
        let start = Instant::now();
        let result: Result<()> =
            wait_until(config(3_000, 500), "never", || async { Ok(None) }).await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(BrowserError::Timeout { .. })));
        assert!(elapsed >= Duration::from_millis(3_000));
        assert!(elapsed <= Duration::from_millis(3_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_propagates_condition_errors_immediately() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = wait_until(config(3_000, 500), "broken", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BrowserError::DriverError("session gone".into()))
        })
        .await;
        assert!(matches!(result, Err(BrowserError::DriverError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ok_retries_designated_kind() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let flaky = move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(BrowserError::DriverError("blip".into()))
            } else {
                Ok("test_text")
            }
        };
        let text = wait_until_ok(config(5_000, 500), "flaky", ErrorKind::External, flaky)
            .await
            .unwrap();
        assert_eq!(text, "test_text");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ok_wraps_error_that_never_subsides() {
        let failing = || async { Err(BrowserError::DriverError("blip".into())) };
        let result: Result<()> =
            wait_until_ok(config(2_000, 500), "always failing", ErrorKind::External, failing).await;
        match result {
            Err(BrowserError::RetryExhausted { source, kind, .. }) => {
                assert_eq!(kind, ErrorKind::External);
                assert!(matches!(*source, BrowserError::DriverError(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ok_does_not_retry_other_kinds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let wrong_kind = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BrowserError::CloseMainWindow)
        };
        let result: Result<()> =
            wait_until_ok(config(2_000, 500), "wrong kind", ErrorKind::External, wrong_kind).await;
        assert!(matches!(result, Err(BrowserError::CloseMainWindow)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
