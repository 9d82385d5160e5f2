use std::future::Future;
use std::time::Duration;

use crate::backoff::exp_backoff;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Duration,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_millis(50),
            cap: Duration::from_secs(2),
            jitter: 0.25,
        }
    }
}

/// Run `operation` up to `policy.max_attempts` times, sleeping an
/// exponentially backed-off, jittered delay between attempts. Only errors
/// accepted by `should_retry` are retried; the last error propagates
/// unchanged.
pub async fn retry<T, E, F, Fut, P>(policy: RetryPolicy, should_retry: P, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !should_retry(&err) || attempt == max_attempts {
                    return Err(err);
                }
                tokio::time::sleep(exp_backoff(attempt, policy.base, policy.cap, policy.jitter))
                    .await;
                attempt += 1;
            }
        }
    }
}
