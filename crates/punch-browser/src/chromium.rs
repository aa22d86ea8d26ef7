//! Chrome DevTools backend built on chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{BrowserError, Result};
use crate::page::{BrowserLauncher, PunchPage};

/// Flags that keep Chrome usable in containers and on headless hosts.
const CHROME_ARGS: &[&str] = &["--disable-gpu", "--disable-dev-shm-usage", "--disable-setuid-sandbox"];

/// Options for launching Chrome.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Explicit Chrome executable; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    /// Upper bound for a single DevTools request, including navigations.
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Launches headless Chrome sessions.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    /// Create a launcher with the given options.
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.options.request_timeout);

        for arg in CHROME_ARGS {
            builder = builder.arg(*arg);
        }
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PunchPage>> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler drives the DevTools connection and must be polled for
        // the whole life of the browser.
        let handler_task = HandlerTask(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler stopped");
                    break;
                }
            }
        }));

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "failed to open page, closing browser");
                if let Err(close_err) = shutdown_browser(browser).await {
                    warn!(error = %close_err, "failed to close browser");
                }
                return Err(e.into());
            }
        };
        info!(headless = self.options.headless, "browser session started");

        Ok(Box::new(ChromiumPage {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
        }))
    }
}

/// Aborts the DevTools handler task when dropped.
struct HandlerTask(JoinHandle<()>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Close the browser and reap its process.
async fn shutdown_browser(mut browser: Browser) -> Result<()> {
    let result = browser.close().await;
    if let Err(e) = browser.wait().await {
        warn!(error = %e, "failed to reap browser process");
    }
    result.map(|_| ()).map_err(BrowserError::from)
}

/// A page in a chromiumoxide-controlled browser.
pub struct ChromiumPage {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: HandlerTask,
}

impl ChromiumPage {
    /// Evaluate a check script that returns `JSON.stringify(...)` and decode it.
    async fn check<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let raw: String = self
            .page
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        trace!(raw = %raw, "check result");
        serde_json::from_str(&raw).map_err(|e| BrowserError::Script(e.to_string()))
    }
}

/// Wrap a function body that receives the first match as `el` (or `null`).
fn check_script(selector: &str, body: &str) -> String {
    // serde_json produces a valid JS string literal for any selector.
    let literal = serde_json::Value::String(selector.to_string()).to_string();
    format!(
        "JSON.stringify((() => {{ const el = document.querySelector({}); {} }})())",
        literal, body
    )
}

const VISIBLE_BODY: &str = "if (!el) return false; \
     const style = window.getComputedStyle(el); \
     if (!style || style.visibility === 'hidden' || style.display === 'none') return false; \
     const rect = el.getBoundingClientRect(); \
     return rect.width > 0 && rect.height > 0;";

const DISABLED_BODY: &str = "return el ? !!el.disabled : null;";

const IMAGE_SOURCE_BODY: &str = "return el ? (el.src || null) : null;";

#[async_trait]
impl PunchPage for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.check(check_script(selector, VISIBLE_BODY)).await
    }

    async fn is_disabled(&self, selector: &str) -> Result<Option<bool>> {
        self.check(check_script(selector, DISABLED_BODY)).await
    }

    async fn image_source(&self, selector: &str) -> Result<Option<String>> {
        self.check(check_script(selector, IMAGE_SOURCE_BODY)).await
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let bytes = self.page.screenshot(ScreenshotParams::builder().build()).await?;
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<()> {
        let closed = match self.browser.get_mut().take() {
            Some(browser) => shutdown_browser(browser).await,
            None => Ok(()),
        };
        self.handler_task.0.abort();

        if closed.is_ok() {
            info!("browser session closed");
        }
        closed
    }
}
