//! Deadline and cancellation plumbing shared by vendor and vision clients.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;

/// Longest vendor error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Runs `fut` under a deadline, aborting early if `cancel` fires.
///
/// The timeout and the caller's token share one abort path: whichever fires
/// first drops the in-flight request.
///
/// # Errors
///
/// Returns [`ScraperError::Timeout`] when `timeout` elapses,
/// [`ScraperError::Cancelled`] when the token fires, otherwise whatever
/// `fut` returns.
pub(crate) async fn with_deadline<T, F>(
    operation: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, ScraperError>
where
    F: Future<Output = Result<T, ScraperError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ScraperError::Cancelled {
            operation: operation.to_owned(),
        }),
        result = tokio::time::timeout(timeout, fut) => result.unwrap_or_else(|_| {
            Err(ScraperError::Timeout {
                operation: operation.to_owned(),
                timeout_ms: duration_ms(timeout),
            })
        }),
    }
}

/// Runs `fut` with no deadline of its own, aborting early if `cancel` fires.
///
/// # Errors
///
/// Returns [`ScraperError::Cancelled`] when the token fires, otherwise
/// whatever `fut` returns.
pub(crate) async fn until_cancelled<T, F>(
    operation: &str,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, ScraperError>
where
    F: Future<Output = Result<T, ScraperError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ScraperError::Cancelled {
            operation: operation.to_owned(),
        }),
        result = fut => result,
    }
}

/// Sleeps for `delay` unless `cancel` fires first.
///
/// # Errors
///
/// Returns [`ScraperError::Cancelled`] if the token fires during the sleep.
pub(crate) async fn sleep_or_cancel(
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<(), ScraperError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ScraperError::Cancelled {
            operation: "retry backoff".to_owned(),
        }),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Reads the body of a vendor response, turning non-2xx statuses into
/// [`ScraperError::VendorStatus`] with the (truncated) body attached.
///
/// # Errors
///
/// Returns [`ScraperError::VendorStatus`] for non-2xx responses and
/// [`ScraperError::Http`] if the body cannot be read.
pub(crate) async fn read_body(
    provider: &str,
    response: reqwest::Response,
) -> Result<String, ScraperError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ScraperError::VendorStatus {
            provider: provider.to_owned(),
            status: status.as_u16(),
            body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
        });
    }

    Ok(body)
}

pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn with_deadline_times_out() {
        let cancel = CancellationToken::new();
        let result: Result<(), _> = with_deadline(
            "Oxylabs request",
            Duration::from_millis(50),
            &cancel,
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ScraperError::Timeout { timeout_ms: 50, .. }));
        assert_eq!(err.to_string(), "Oxylabs request timed out after 50ms");
    }

    #[tokio::test]
    async fn with_deadline_honors_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = with_deadline(
            "Apify actor run",
            Duration::from_secs(5),
            &cancel,
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(ScraperError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn with_deadline_passes_through_result() {
        let cancel = CancellationToken::new();
        let result = with_deadline("op", Duration::from_secs(1), &cancel, async {
            Ok::<_, ScraperError>(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn until_cancelled_waits_past_any_deadline() {
        let cancel = CancellationToken::new();
        let result = until_cancelled("Apify actor run", &cancel, async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok::<_, ScraperError>("done")
        })
        .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn until_cancelled_honors_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> =
            until_cancelled("Oxylabs request", &cancel, std::future::pending()).await;
        assert!(matches!(result, Err(ScraperError::Cancelled { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_or_cancel_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });
        let result = sleep_or_cancel(Duration::from_secs(60), &cancel).await;
        assert!(matches!(result, Err(ScraperError::Cancelled { .. })));
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
