//! Bounded retry with exponential backoff for the outbound HTTP clients.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            retryable_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self::with_max_retries(0)
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status.as_u16())
    }

    /// `base * 2^attempt`, capped, with a deterministic +/-25% spread.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp_delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(10));
        let capped = exp_delay.min(self.max_delay_ms);

        let jitter_range = capped / 4;
        let delay = if jitter_range > 0 {
            let offset = (attempt as u64 * 7 + 3) % (jitter_range * 2 + 1);
            capped - jitter_range + offset
        } else {
            capped
        };
        Duration::from_millis(delay)
    }
}

/// Transport errors worth another attempt.
pub fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[derive(Debug)]
pub enum AttemptOutcome<T, E> {
    Success(T),
    Retryable { status: StatusCode, body: String },
    Fatal(E),
}

/// Runs `operation` until it succeeds, fails fatally, or retries run out.
/// `exhausted` builds the error returned after the last retryable failure.
pub async fn with_retry<T, E, F, Fut, X>(
    config: &RetryConfig,
    operation: F,
    exhausted: X,
) -> Result<T, E>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T, E>>,
    X: FnOnce(u32, StatusCode, String) -> E,
{
    let mut last_status = StatusCode::INTERNAL_SERVER_ERROR;
    let mut last_body = String::new();

    for attempt in 0..=config.max_retries {
        match operation(attempt).await {
            AttemptOutcome::Success(value) => {
                if attempt > 0 {
                    tracing::info!("request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            AttemptOutcome::Fatal(err) => return Err(err),
            AttemptOutcome::Retryable { status, body } => {
                last_status = status;
                last_body = body;
                if attempt < config.max_retries {
                    let delay = config.delay_for_attempt(attempt);
                    tracing::warn!(
                        "request failed with {} (attempt {}/{}), retrying in {:?}",
                        status,
                        attempt + 1,
                        config.max_retries + 1,
                        delay,
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(exhausted(config.max_retries + 1, last_status, last_body))
}
