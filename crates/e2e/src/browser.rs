//! Chromium driver for the browser port
//!
//! Each scenario gets its own Chromium process with a throwaway profile
//! directory, so cookies and storage never leak between sessions.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vetprobe_common::BrowserSettings;

use crate::error::{E2eError, E2eResult};
use crate::page::{ClickMode, Key, Locator, Page};
use crate::runner::SessionFactory;

const IS_VISIBLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; \
}";

const IS_CHECKED_JS: &str = "function() { return !!this.checked; }";

const FORCE_CLICK_JS: &str = "function() { this.click(); }";

/// Set the value through the native setter so framework-managed inputs see it
fn fill_js(value: &str) -> E2eResult<String> {
    let value = serde_json::to_string(value)?;
    Ok(format!(
        "function() {{ \
            this.focus(); \
            const proto = Object.getPrototypeOf(this); \
            const setter = Object.getOwnPropertyDescriptor(proto, 'value').set; \
            setter.call(this, {}); \
            this.dispatchEvent(new Event('input', {{ bubbles: true }})); \
            this.dispatchEvent(new Event('change', {{ bubbles: true }})); \
        }}",
        value
    ))
}

/// One Chromium session implementing [`Page`]
pub struct ChromiumPage {
    page: chromiumoxide::Page,
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    _profile: tempfile::TempDir,
}

impl ChromiumPage {
    pub async fn launch(settings: &BrowserSettings) -> E2eResult<Self> {
        let profile = tempfile::Builder::new().prefix("vetprobe-profile-").tempdir()?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(settings.viewport_width, settings.viewport_height)
            .request_timeout(Duration::from_millis(settings.request_timeout_ms));
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(E2eError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // Spawn handler to process browser events
        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        debug!("Chromium session ready (profile {})", profile.path().display());

        Ok(Self {
            page,
            browser: Mutex::new(Some(browser)),
            handler,
            _profile: profile,
        })
    }

    /// Elements matching the locator's query and filters, in document order
    async fn candidates(&self, locator: &Locator) -> E2eResult<Vec<Element>> {
        let elements = self.page.find_elements(locator.css_query()).await?;
        let mut matching = Vec::with_capacity(elements.len());
        for element in elements {
            if locator.placeholder_needle().is_some() {
                let placeholder = element.attribute("placeholder").await?;
                if !locator.matches_placeholder(placeholder.as_deref()) {
                    continue;
                }
            }
            if locator.text.is_some() {
                let text = element.inner_text().await?.unwrap_or_default();
                if !locator.matches_text(&text) {
                    continue;
                }
            }
            matching.push(element);
        }
        Ok(matching)
    }

    async fn find(&self, locator: &Locator) -> E2eResult<Option<Element>> {
        Ok(self.candidates(locator).await?.into_iter().nth(locator.nth))
    }

    async fn element(&self, locator: &Locator) -> E2eResult<Element> {
        self.find(locator)
            .await?
            .ok_or_else(|| E2eError::ElementNotFound(locator.to_string()))
    }

    async fn js_bool(element: &Element, function: &str) -> E2eResult<bool> {
        let returns = element.call_js_fn(function, false).await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        Ok(self.candidates(locator).await?.len())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        match self.find(locator).await? {
            Some(element) => Self::js_bool(&element, IS_VISIBLE_JS).await,
            None => Ok(false),
        }
    }

    async fn text(&self, locator: &Locator) -> E2eResult<Option<String>> {
        match self.find(locator).await? {
            Some(element) => Ok(element.inner_text().await?),
            None => Ok(None),
        }
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        match self.find(locator).await? {
            Some(element) => Ok(element.attribute(name).await?),
            None => Ok(None),
        }
    }

    async fn is_checked(&self, locator: &Locator) -> E2eResult<bool> {
        let element = self.element(locator).await?;
        Self::js_bool(&element, IS_CHECKED_JS).await
    }

    async fn click(&self, locator: &Locator, mode: ClickMode) -> E2eResult<()> {
        let element = self.element(locator).await?;
        match mode {
            ClickMode::Normal => {
                element.scroll_into_view().await?;
                element.click().await?;
            }
            ClickMode::Force => {
                element.call_js_fn(FORCE_CLICK_JS, false).await?;
            }
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let element = self.element(locator).await?;
        element.call_js_fn(fill_js(value)?, false).await?;
        Ok(())
    }

    async fn type_keys(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        let element = self.element(locator).await?;
        element.focus().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: Key) -> E2eResult<()> {
        let element = self.element(locator).await?;
        element.focus().await?;
        element.press_key(key.name()).await?;
        Ok(())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn close(&self) -> E2eResult<()> {
        let browser = self.browser.lock().take();
        if let Some(mut browser) = browser {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            browser.wait().await?;
        }
        self.handler.abort();
        Ok(())
    }
}

/// Launches a fresh Chromium for every scenario
pub struct ChromiumFactory {
    settings: BrowserSettings,
}

impl ChromiumFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    async fn open(&self, scenario: &str) -> E2eResult<Arc<dyn Page>> {
        info!("Launching Chromium for {}", scenario);
        let page = ChromiumPage::launch(&self.settings).await?;
        Ok(Arc::new(page))
    }
}
