//! Save outcome detection
//!
//! After a save the application shows a success toast, an error toast, or
//! nothing. Both toasts are watched concurrently, each with its own window.
//! An error seen at any point wins over a success seen at the same poll.
//!
//! A toast kind still showing from an earlier save when Save is clicked
//! cannot be told apart from a fresh one, so that kind is not watched.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::E2eResult;
use crate::page::{Locator, Page};
use crate::selectors::toast;
use crate::wait::{poll_until, wait_text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeSignal {
    Success(String),
    Error(String),
    /// Neither toast appeared within its window
    Unknown,
}

/// Windows for the two toast probes
#[derive(Debug, Clone, Copy)]
pub struct OutcomeWindows {
    pub success: Duration,
    pub error: Duration,
    pub poll_interval: Duration,
}

async fn probe(page: &dyn Page, selector: &str, window: Duration, interval: Duration) -> E2eResult<Option<String>> {
    let locator = Locator::css(selector);
    match wait_text(page, &locator, window, interval).await {
        Ok(text) => Ok(Some(text.trim().to_string())),
        Err(e) if e.is_timeout() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Toast kinds still on screen from an earlier save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaleToasts {
    pub success: bool,
    pub error: bool,
}

impl StaleToasts {
    pub fn any(&self) -> bool {
        self.success || self.error
    }
}

async fn showing(page: &dyn Page) -> E2eResult<StaleToasts> {
    Ok(StaleToasts {
        success: page.is_visible(&Locator::css(toast::SUCCESS)).await?,
        error: page.is_visible(&Locator::css(toast::ERROR)).await?,
    })
}

/// Wait for toasts left over from an earlier save to go away
///
/// Returns whichever kinds are still showing after `window`.
pub async fn clear_stale_toasts(page: &dyn Page, window: Duration, interval: Duration) -> E2eResult<StaleToasts> {
    let cleared = poll_until(window, interval, "stale toasts to clear", move || async move {
        Ok((!showing(page).await?.any()).then_some(()))
    })
    .await;
    match cleared {
        Ok(()) => Ok(StaleToasts::default()),
        Err(e) if e.is_timeout() => {
            let stale = showing(page).await?;
            if stale.any() {
                warn!(
                    "Toast still showing before save (success: {}, error: {}); ignoring that kind",
                    stale.success, stale.error
                );
            }
            Ok(stale)
        }
        Err(e) => Err(e),
    }
}

/// Race the success and error toasts and report the first to appear
///
/// Kinds marked in `stale` are skipped; with both skipped the outcome is
/// [`OutcomeSignal::Unknown`].
pub async fn await_outcome(
    page: &dyn Page,
    windows: OutcomeWindows,
    stale: StaleToasts,
) -> E2eResult<OutcomeSignal> {
    let error = probe(page, toast::ERROR, windows.error, windows.poll_interval);
    let success = probe(page, toast::SUCCESS, windows.success, windows.poll_interval);
    tokio::pin!(error);
    tokio::pin!(success);

    let mut error_done = stale.error;
    let mut success_done = stale.success;
    loop {
        tokio::select! {
            biased;
            found = &mut error, if !error_done => {
                error_done = true;
                if let Some(message) = found? {
                    debug!("Error toast: {}", message);
                    return Ok(OutcomeSignal::Error(message));
                }
            }
            found = &mut success, if !success_done => {
                success_done = true;
                if let Some(message) = found? {
                    debug!("Success toast: {}", message);
                    return Ok(OutcomeSignal::Success(message));
                }
            }
            else => return Ok(OutcomeSignal::Unknown),
        }
    }
}
