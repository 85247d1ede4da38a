use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Backoff applied when a translation service answers with a rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    pub(crate) fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    /// Sleeps for the current delay (or the server's `Retry-After`, if longer
    /// and still under `max_delay`) and returns the next delay.
    pub(crate) async fn wait(
        &self,
        provider: &str,
        attempt: usize,
        delay: Duration,
        retry_after: Option<Duration>,
    ) -> Duration {
        let mut wait = delay;
        if let Some(retry_after) = retry_after
            && retry_after > wait
        {
            wait = retry_after.min(self.max_delay);
        }
        warn!(
            "{} rate limited; retrying in {:.1}s (attempt {}/{})",
            provider,
            wait.as_secs_f32(),
            attempt,
            self.max_attempts
        );
        sleep(wait).await;
        self.next_delay(delay)
    }

    pub(crate) fn next_delay(&self, current: Duration) -> Duration {
        current
            .saturating_mul(2)
            .max(self.base_delay)
            .min(self.max_delay)
    }
}

pub(crate) fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let code = status.as_u16();
    if code == 529 || code == 503 {
        return true;
    }
    let lower = body.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("slow down")
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    value.parse::<u64>().ok().map(Duration::from_secs)
}
