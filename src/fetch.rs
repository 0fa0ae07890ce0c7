//! # Stage: Fetcher
//!
//! ## Responsibility
//! Issue HTTP GETs against fixed endpoints with a bounded exponential
//! backoff, and decode successful bodies as JSON.
//!
//! ## Guarantees
//! - Any non-2xx status is a failure, exactly like a transport error
//! - At most `max_attempts` requests per call; the wait after the k-th failed
//!   attempt is `base * 2^(k-1)`, with no jitter
//! - The final failure is surfaced unchanged once attempts are exhausted
//! - Decode failures surface as [`FetchError::Decode`] and are not retried
//!
//! ## NOT Responsible For
//! - Falling back to static content (each widget decides)
//! - Timeouts beyond the client's connect/request limits

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderValue, CACHE_CONTROL};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::metrics;

/// Default number of attempts per fetch.
pub const DEFAULT_ATTEMPTS: usize = 3;

/// Default backoff base.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Failure of a single fetch call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, timeout, …).
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The body was not the JSON document we expected.
    #[error("invalid JSON: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
        }
    }
}

// ── Retry policy ───────────────────────────────────────────────────────────

/// Bounded exponential backoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: usize,
    /// Wait after the first failed attempt; doubles after each further one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_ATTEMPTS, DEFAULT_BACKOFF_BASE)
    }
}

impl RetryPolicy {
    /// Create policy with exponential backoff.
    pub fn exponential(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::exponential(1, Duration::ZERO)
    }

    /// Wait after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Sum of all waits a fully failing call incurs.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.delay_after(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Execute operation with retries.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once `max_attempts` is reached.
    pub async fn retry<F, Fut, T, E>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            debug!(attempt, max = self.max_attempts, "retry: attempting operation");

            match f().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "retry: operation succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        error = %e,
                        "retry: operation failed"
                    );

                    if attempt >= self.max_attempts {
                        warn!(attempts = attempt, "retry: all attempts exhausted");
                        return Err(e);
                    }

                    let delay = self.delay_after(attempt);
                    debug!(delay_ms = delay.as_millis() as u64, "retry: waiting before next attempt");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

// ── Endpoint descriptor ────────────────────────────────────────────────────

/// A fixed endpoint: where to fetch, how often, and how hard to retry.
#[derive(Clone, Debug)]
pub struct Endpoint {
    /// Short name used in logs and metric labels (e.g. `"telemetry"`).
    pub name: String,
    /// Absolute URL.
    pub url: Url,
    /// Polling interval for widgets that refresh.
    pub interval: Duration,
    /// Retry policy for each fetch.
    pub retry: RetryPolicy,
    /// Ask intermediaries not to cache the response.
    pub no_store: bool,
}

impl Endpoint {
    /// Create an endpoint with the default retry policy and no polling.
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            interval: Duration::ZERO,
            retry: RetryPolicy::default(),
            no_store: false,
        }
    }

    /// Set the polling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send `Cache-Control: no-store` with every request.
    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }
}

// ── Fetcher ────────────────────────────────────────────────────────────────

/// Shared HTTP client with the retry loop built in.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}

impl Fetcher {
    /// Build a fetcher with the given connect and per-request timeouts.
    ///
    /// # Panics
    ///
    /// This function never panics; a client that cannot be configured falls
    /// back to reqwest defaults.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!("mission-deck/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// GET `endpoint`, retrying per its policy.
    ///
    /// # Errors
    ///
    /// Returns the last [`FetchError`] once every attempt has failed.
    pub async fn get(&self, endpoint: &Endpoint) -> Result<reqwest::Response, FetchError> {
        let started = Instant::now();
        let result = endpoint
            .retry
            .retry(|| self.attempt(endpoint))
            .await;
        metrics::record_fetch_duration(&endpoint.name, started.elapsed());
        result
    }

    /// GET `endpoint` and decode the body as `T`.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] from [`Fetcher::get`], or [`FetchError::Decode`]
    /// when the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, FetchError> {
        let response = self.get(endpoint).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            let err = FetchError::Decode(e.to_string());
            metrics::inc_fetch_failure(&endpoint.name, err.kind());
            err
        })
    }

    async fn attempt(&self, endpoint: &Endpoint) -> Result<reqwest::Response, FetchError> {
        metrics::inc_fetch_attempt(&endpoint.name);

        let mut request = self.client.get(endpoint.url.clone());
        if endpoint.no_store {
            request = request.header(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }

        let outcome = match request.send().await {
            Ok(resp) if resp.status().is_success() => Ok(resp),
            Ok(resp) => Err(FetchError::Status(resp.status().as_u16())),
            Err(e) => Err(FetchError::Transport(e.to_string())),
        };

        if let Err(e) = &outcome {
            metrics::inc_fetch_failure(&endpoint.name, e.kind());
            debug!(endpoint = %endpoint.name, url = %endpoint.url, error = %e, "fetch attempt failed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_policy_is_three_attempts_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_exponential_backoff_doubles() {
        let policy = RetryPolicy::exponential(4, Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_total_backoff_for_three_attempts() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1000));
        assert_eq!(policy.total_backoff(), Duration::from_millis(3000));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::exponential(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.total_backoff(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_third_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::default();

        let counter = attempts.clone();
        let result = policy
            .retry(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient")
                    } else {
                        Ok("payload")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("payload"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_after_full_backoff() {
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();

        let result = policy
            .retry(|| async { Err::<(), _>("always fails") })
            .await;

        assert_eq!(result, Err("always fails"));
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_policy_never_waits() {
        let attempts = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();
        let result = RetryPolicy::once()
            .retry(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("down") }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(FetchError::Status(404).to_string(), "HTTP 404");
        assert_eq!(FetchError::Decode("eof".into()).kind(), "decode");
    }
}
