use std::sync::Arc;
use std::time::Duration;

use listport_core::ScrapedProduct;

use crate::http::duration_ms;

/// One provider call made during a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub provider: String,
    /// 1-based attempt number within this provider.
    pub attempt: u32,
    pub success: bool,
    /// Error message for failed attempts.
    pub error: Option<String>,
    pub duration: Duration,
}

impl AttemptRecord {
    pub(crate) fn succeeded(provider: &str, attempt: u32, duration: Duration) -> Self {
        Self {
            provider: provider.to_owned(),
            attempt,
            success: true,
            error: None,
            duration,
        }
    }

    pub(crate) fn failed(provider: &str, attempt: u32, duration: Duration, error: String) -> Self {
        Self {
            provider: provider.to_owned(),
            attempt,
            success: false,
            error: Some(error),
            duration,
        }
    }

    /// `"oxylabs: failed (1203 ms)"`
    #[must_use]
    pub fn summary(&self) -> String {
        let outcome = if self.success { "ok" } else { "failed" };
        format!(
            "{}: {outcome} ({} ms)",
            self.provider,
            duration_ms(self.duration)
        )
    }
}

/// A successful scrape together with every attempt it took.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub product: ScrapedProduct,
    pub attempts: Vec<AttemptRecord>,
}

/// Callback invoked with every attempt as it is recorded.
pub type AttemptObserver = Arc<dyn Fn(&AttemptRecord) + Send + Sync>;

pub(crate) fn summarize(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "none".to_string();
    }
    attempts
        .iter()
        .map(AttemptRecord::summary)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Delay before retrying after failed attempt `attempt` (1-based):
/// `base_ms * 2^(attempt-1)`.
pub(crate) fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    Duration::from_millis(base_ms.saturating_mul(1_u64 << exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1000, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1000, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(1000, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(0, 5), Duration::ZERO);
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        assert_eq!(
            backoff_delay(u64::MAX / 2, 40),
            Duration::from_millis(u64::MAX)
        );
    }

    #[test]
    fn summarize_lists_every_attempt() {
        let attempts = vec![
            AttemptRecord::failed("oxylabs", 1, Duration::from_millis(120), "503".to_string()),
            AttemptRecord::succeeded("apify", 1, Duration::from_millis(2400)),
        ];
        assert_eq!(
            summarize(&attempts),
            "oxylabs: failed (120 ms), apify: ok (2400 ms)"
        );
        assert_eq!(summarize(&[]), "none");
    }
}
