//! One isolated browser session plus the settings it runs with

use std::sync::Arc;
use std::time::Duration;
use vetprobe_common::{SuiteConfig, Timeouts};

use crate::error::E2eResult;
use crate::events::{EventSink, ResolveEvent};
use crate::page::{Locator, Page};
use crate::wait;

#[derive(Clone)]
pub struct Session {
    pub page: Arc<dyn Page>,
    pub config: Arc<SuiteConfig>,
    pub events: Arc<dyn EventSink>,
}

impl Session {
    pub fn new(page: Arc<dyn Page>, config: Arc<SuiteConfig>, events: Arc<dyn EventSink>) -> Self {
        Self {
            page,
            config,
            events,
        }
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.config.timeouts
    }

    pub fn emit(&self, event: ResolveEvent) {
        self.events.emit(&event);
    }

    /// Navigate to an application path relative to the base URL
    pub async fn goto_path(&self, path: &str) -> E2eResult<()> {
        let url = self.config.app.url(path);
        self.page.goto(&url).await
    }

    pub async fn wait_visible(&self, locator: &Locator, window: Duration) -> E2eResult<()> {
        wait::wait_visible(
            self.page(),
            locator,
            window,
            self.timeouts().poll_interval(),
        )
        .await
    }

    pub async fn settle(&self) {
        wait::settle(self.timeouts().settle()).await;
    }
}
