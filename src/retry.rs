// SPDX-License-Identifier: Apache-2.0

//! Bounded retry with gradual linear backoff.

use std::future::Future;
use std::time::Duration;

use crate::error::{DriverError, DriverResult};

/// Runs `op`, retrying while `should_retry` accepts the error, up to
/// `max_retries` additional attempts. Attempt `n` sleeps `n` seconds before
/// re-running, so the schedule backs off gradually from an immediate retry.
pub async fn with_linear_backoff<T, F, Fut, P>(
    max_retries: u32,
    should_retry: P,
    mut op: F,
) -> DriverResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DriverResult<T>>,
    P: Fn(&DriverError) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && should_retry(&err) => {
                tracing::debug!(attempt, error = %err, "retrying query");
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
