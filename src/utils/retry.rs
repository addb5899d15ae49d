use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub factor: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            attempts: 3,
            initial_delay: Duration::from_millis(500),
            factor: 2,
        }
    }
}

#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `operation` until it succeeds or the attempts run out, sleeping
/// between attempts with exponentially growing delays.
pub async fn retry_with_backoff<T, E, F, Fut>(
    backoff: Backoff,
    what: &str,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = backoff.attempts.max(1);
    let mut delay = backoff.initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: err,
                })
            }
            Err(err) => {
                warn!("Attempt {attempt}/{attempts} to {what} failed, retrying in {delay:?}: {err}");
                tokio::time::sleep(delay).await;
                delay *= backoff.factor;
                attempt += 1;
            }
        }
    }
}
