//! Condition polling
//!
//! The application renders asynchronously, so every observation the suite
//! makes is a poll with a bounded window. Deadlines use tokio's clock.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::page::{Locator, Page};

/// Poll `probe` every `interval` until it yields a value or `window` elapses
///
/// The probe is always run at least once. Errors from the probe abort the
/// wait immediately; `Ok(None)` means "not yet".
pub async fn poll_until<T, F, Fut>(
    window: Duration,
    interval: Duration,
    what: &str,
    mut probe: F,
) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let deadline = Instant::now() + window;
    let mut polls = 0u32;
    loop {
        polls += 1;
        if let Some(value) = probe().await? {
            debug!("{} after {} poll(s)", what, polls);
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(E2eError::Timeout(what.to_string()));
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Wait until the locator matches a visible element
pub async fn wait_visible(
    page: &dyn Page,
    locator: &Locator,
    window: Duration,
    interval: Duration,
) -> E2eResult<()> {
    let what = format!("{} visible", locator);
    poll_until(window, interval, &what, move || async move {
        Ok(page.is_visible(locator).await?.then_some(()))
    })
    .await
}

/// Wait until the locator's element has text and return it
pub async fn wait_text(
    page: &dyn Page,
    locator: &Locator,
    window: Duration,
    interval: Duration,
) -> E2eResult<String> {
    let what = format!("text of {}", locator);
    poll_until(window, interval, &what, move || async move {
        if !page.is_visible(locator).await? {
            return Ok(None);
        }
        Ok(page.text(locator).await?.filter(|t| !t.trim().is_empty()))
    })
    .await
}

/// Wait until the current URL satisfies `accept`
pub async fn wait_url<F>(
    page: &dyn Page,
    window: Duration,
    interval: Duration,
    what: &str,
    accept: F,
) -> E2eResult<String>
where
    F: Fn(&str) -> bool,
{
    let accept = &accept;
    poll_until(window, interval, what, move || async move {
        let url = page.current_url().await?;
        Ok(accept(&url).then_some(url))
    })
    .await
}

/// Fixed margin after an interaction that triggers an animation
pub async fn settle(margin: Duration) {
    if !margin.is_zero() {
        sleep(margin).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_first_value() {
        let calls = &AtomicU32::new(0);
        let value = poll_until(
            Duration::from_secs(1),
            Duration::from_millis(100),
            "third poll",
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok((n == 3).then_some(n))
            },
        )
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out() {
        let start = Instant::now();
        let err = poll_until::<(), _, _>(
            Duration::from_millis(500),
            Duration::from_millis(100),
            "never",
            || async { Ok(None) },
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_propagates_probe_error() {
        let err = poll_until::<(), _, _>(
            Duration::from_secs(5),
            Duration::from_millis(100),
            "broken",
            || async { Err(E2eError::Browser("gone".into())) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::Browser(_)));
    }
}
