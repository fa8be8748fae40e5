use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::{LookupError, LookupOutcome};
use crate::config::LookupConfig;

/// Bounded exponential backoff with a timeout on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LookupConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LookupConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.backoff_multiplier,
            timeout: config.timeout(),
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `op` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// `Ok(None)` from `op` means the service had nothing and is not retried.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> LookupOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, LookupError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(LookupError::Timeout(self.timeout)),
            };

            match result {
                Ok(Some(value)) => return LookupOutcome::Found(value),
                Ok(None) => return LookupOutcome::NotFound,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff_after(attempt);
                    debug!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("{} unavailable after {} attempt(s): {}", label, attempt, e);
                    return LookupOutcome::Unavailable {
                        error: e.to_string(),
                        http_status: e.http_status(),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
