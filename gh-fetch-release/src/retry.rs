use crate::error::{FetchError, Result};
use backoff::future::retry_notify;
use backoff::ExponentialBackoff;
use std::cell::Cell;
use std::future::Future;
use std::time::Duration;

/// How hard the GitHub client tries before giving up on a request.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryConfig {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: self.max_elapsed_time,
            ..Default::default()
        }
    }

    fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Run a network request, retrying it while it fails transiently.
///
/// Errors for which [`FetchError::is_transient`] is false end the loop at
/// once, as does running out of attempts or elapsed time.
pub async fn with_retry<F, Fut, T>(what: &str, config: &RetryConfig, mut request: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempt = Cell::new(0u32);

    let outcome = retry_notify(
        config.backoff(),
        || {
            attempt.set(attempt.get() + 1);
            let pending = request();
            let current = attempt.get();
            async move {
                pending.await.map_err(|err| {
                    if err.is_transient() && current < config.attempts() {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        },
        |err: FetchError, wait: Duration| {
            tracing::warn!(
                "{} failed (attempt {} of {}): {}. Retrying in {:?}",
                what,
                attempt.get(),
                config.attempts(),
                err,
                wait
            );
        },
    )
    .await;

    match &outcome {
        Ok(_) if attempt.get() > 1 => {
            tracing::info!("{} succeeded on attempt {}", what, attempt.get())
        }
        Err(err) if err.is_transient() => {
            tracing::warn!("{} gave up after {} attempts: {}", what, attempt.get(), err)
        }
        _ => {}
    }
    outcome
}
