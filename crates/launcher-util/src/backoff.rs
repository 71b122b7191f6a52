//! Bounded retry for operations that can fail transiently, such as removing a
//! socket file whose handle a just-exited process has not released yet.

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Calls `op` until it succeeds or `timeout` has elapsed, sleeping `interval`
/// between attempts. The last error is returned once the bound is exceeded.
pub async fn wait_for<T, E, F>(mut op: F, timeout: Duration, interval: Duration) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if Instant::now() + interval > deadline {
                    return Err(err);
                }
                sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests;
