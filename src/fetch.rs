// Rate-limited HTTP fetch with retry/backoff, one instance per API origin.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Response, StatusCode, Url};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Minimum wall-clock spacing between successive requests issued through one
/// client instance. The check-then-stamp sequence holds the mutex across the
/// wait so concurrent callers are serialized and the floor holds pairwise.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        RateLimiter {
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait_if_needed(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_delay
            .mul_f64(self.backoff_multiplier.powi(attempt as i32))
    }
}

/// Responses that can signal provider throttling (HTTP 429).
pub(crate) trait Throttled {
    fn is_throttled(&self) -> bool;
}

impl Throttled for Response {
    fn is_throttled(&self) -> bool {
        self.status() == StatusCode::TOO_MANY_REQUESTS
    }
}

/// Runs `attempt_fn` up to `max_retries + 1` times. A throttled response or a
/// transport error sleeps the backoff schedule and reissues; once attempts are
/// exhausted a throttled response is returned as-is (the caller sees the final
/// status) while a transport error propagates.
pub(crate) async fn retry_with_backoff<R, E, F, Fut>(
    policy: &RetryPolicy,
    mut attempt_fn: F,
) -> Result<R, E>
where
    R: Throttled,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    for attempt in 0..=policy.max_retries {
        match attempt_fn().await {
            Ok(resp) if resp.is_throttled() && attempt < policy.max_retries => {
                let wait = policy.backoff_delay(attempt);
                tracing::warn!(
                    wait_ms = wait.as_millis() as u64,
                    retry = attempt + 1,
                    max_retries = policy.max_retries,
                    "rate limited, backing off"
                );
                sleep(wait).await;
            }
            Ok(resp) => return Ok(resp),
            Err(_) if attempt < policy.max_retries => {
                sleep(policy.backoff_delay(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("retry loop returns within its final iteration")
}

/// HTTP client bound to one external origin: enforces that origin's request
/// floor and retry tuning. The limiter gates each logical request once; retry
/// reissues do not re-stamp the limiter clock.
#[derive(Debug)]
pub struct RateLimitedClient {
    http: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl RateLimitedClient {
    pub fn new(min_delay: Duration, retry: RetryPolicy) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(RateLimitedClient {
            http,
            limiter: RateLimiter::new(min_delay),
            retry,
        })
    }

    pub async fn get(&self, url: Url) -> anyhow::Result<Response> {
        self.limiter.wait_if_needed().await;
        tracing::debug!(%url, "GET");
        retry_with_backoff(&self.retry, || self.http.get(url.clone()).send())
            .await
            .with_context(|| format!("request failed: {url}"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[derive(Debug)]
    struct StubResponse {
        throttled: bool,
    }

    impl Throttled for StubResponse {
        fn is_throttled(&self) -> bool {
            self.throttled
        }
    }

    #[test]
    fn backoff_delay_schedule() {
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_every_attempt_issues_max_retries_plus_one() {
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        };
        let mut attempts = 0u32;
        let result: Result<StubResponse, String> = retry_with_backoff(&policy, || {
            attempts += 1;
            async { Ok(StubResponse { throttled: true }) }
        })
        .await;
        // The final throttled response comes back instead of an error.
        assert!(result.expect("final response returned").is_throttled());
        assert_eq!(attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_exhausts_retries_then_propagates() {
        let policy = RetryPolicy {
            max_retries: 2,
            retry_delay: Duration::from_millis(50),
            backoff_multiplier: 1.5,
        };
        let mut attempts = 0u32;
        let result: Result<StubResponse, String> = retry_with_backoff(&policy, || {
            attempts += 1;
            async { Err("connection reset".to_string()) }
        })
        .await;
        assert_eq!(result.unwrap_err(), "connection reset");
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_throttling_clears() {
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        };
        let mut attempts = 0u32;
        let result: Result<StubResponse, String> = retry_with_backoff(&policy, || {
            attempts += 1;
            let throttled = attempts < 3;
            async move { Ok(StubResponse { throttled }) }
        })
        .await;
        assert!(!result.expect("response").is_throttled());
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_spaces_sequential_requests() {
        let floor = Duration::from_millis(400);
        let limiter = RateLimiter::new(floor);
        let mut stamps = Vec::new();
        for _ in 0..4 {
            limiter.wait_if_needed().await;
            stamps.push(Instant::now());
        }
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= floor);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_spaces_concurrent_callers() {
        let floor = Duration::from_millis(300);
        let limiter = Arc::new(RateLimiter::new(floor));
        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.wait_if_needed().await;
                Instant::now()
            }));
        }
        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.expect("task"));
        }
        stamps.sort();
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= floor);
        }
    }
}
