//! Chromium-based renderer using chromiumoxide.

use super::{Keystroke, NavigableBrowser, Renderer, TrustCookie};
use crate::error::{HarvestError, HarvestResult};
use crate::stealth::fingerprint;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{ClearBrowserCookiesParams, CookieParam};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Interval between landmark presence polls.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| p.exists()) {
        return Some(path.clone());
    }

    if let Ok(p) = std::env::var("HARVEST_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidates = [
            home.join(".harvest/chromium/chrome-linux64/chrome"),
            home.join(".harvest/chromium/chrome"),
        ];
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

fn cdp(context: &'static str) -> impl FnOnce(CdpError) -> HarvestError {
    move |e| HarvestError::Browser(format!("{context}: {e}"))
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance with the stealth launch flags.
    pub async fn launch(chromium_path: Option<&PathBuf>, headless: bool) -> HarvestResult<Self> {
        let chrome_path = find_chromium(chromium_path).ok_or_else(|| {
            HarvestError::Config(
                "Chromium not found. Set HARVEST_CHROMIUM_PATH or browser.chromium_path".into(),
            )
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .with_head();
        for arg in fingerprint::launch_args(headless) {
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(cdp("failed to launch Chromium"))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {e}");
                }
            }
        });

        Ok(Self { browser })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> HarvestResult<Box<dyn NavigableBrowser>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(cdp("failed to create new page"))?;

        page.evaluate_on_new_document(fingerprint::STEALTH_SCRIPT.to_string())
            .await
            .map_err(cdp("failed to install stealth script"))?;
        page.set_user_agent(fingerprint::DESKTOP_USER_AGENT)
            .await
            .map_err(cdp("failed to set user agent"))?;

        Ok(Box::new(ChromiumContext { page }))
    }

    async fn shutdown(&self) -> HarvestResult<()> {
        // Browser is dropped when ChromiumRenderer is dropped
        Ok(())
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
}

impl ChromiumContext {
    async fn eval_json(&self, script: String) -> HarvestResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(cdp("JS execution failed"))?;
        result
            .into_value()
            .map_err(|e| HarvestError::Browser(format!("failed to convert JS result: {e:?}")))
    }
}

#[async_trait]
impl NavigableBrowser for ChromiumContext {
    async fn navigate(&mut self, url: &str) -> HarvestResult<()> {
        self.page.goto(url).await.map_err(cdp("navigation failed"))?;
        Ok(())
    }

    async fn current_location(&self) -> HarvestResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(cdp("failed to get URL"))?
            .unwrap_or_default();
        Ok(url)
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> HarvestResult<()> {
        let start = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(HarvestError::Timeout {
                    selector: selector.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn raw_document(&self) -> HarvestResult<String> {
        self.page.content().await.map_err(cdp("failed to get HTML"))
    }

    async fn type_key(&mut self, selector: &str, key: Keystroke) -> HarvestResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(cdp("input not found"))?;
        element.focus().await.map_err(cdp("failed to focus input"))?;
        match key {
            Keystroke::Char(c) => {
                element
                    .type_str(c.to_string())
                    .await
                    .map_err(cdp("failed to type"))?;
            }
            Keystroke::Backspace => {
                element
                    .press_key("Backspace")
                    .await
                    .map_err(cdp("failed to press Backspace"))?;
            }
            Keystroke::Enter => {
                element
                    .press_key("Enter")
                    .await
                    .map_err(cdp("failed to press Enter"))?;
            }
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> HarvestResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(cdp("click target not found"))?;
        element.click().await.map_err(cdp("click failed"))?;
        Ok(())
    }

    async fn click_containing_text(&mut self, selector: &str, text: &str) -> HarvestResult<()> {
        let script = format!(
            r#"(() => {{
                const needle = {text};
                const el = [...document.querySelectorAll({selector})]
                    .find(e => e.textContent.includes(needle));
                if (!el) {{ return false; }}
                el.click();
                return true;
            }})()"#,
            text = serde_json::to_string(text)?,
            selector = serde_json::to_string(selector)?,
        );
        match self.eval_json(script).await?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(HarvestError::Browser(format!(
                "no `{selector}` containing {text:?}"
            ))),
        }
    }

    async fn count(&self, selector: &str) -> HarvestResult<usize> {
        let script = format!(
            "document.querySelectorAll({}).length",
            serde_json::to_string(selector)?
        );
        Ok(self.eval_json(script).await?.as_u64().unwrap_or(0) as usize)
    }

    async fn scroll_into_view(&mut self, selector: &str, index: usize) -> HarvestResult<()> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelectorAll({selector})[{index}];
                if (!el) {{ return false; }}
                el.scrollIntoView({{behavior: 'smooth', block: 'center'}});
                return true;
            }})()"#,
            selector = serde_json::to_string(selector)?,
        );
        match self.eval_json(script).await?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(HarvestError::Browser(format!(
                "no `{selector}` at index {index}"
            ))),
        }
    }

    async fn replace_cookies(&mut self, cookies: &[TrustCookie]) -> HarvestResult<usize> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(cdp("failed to clear cookies"))?;

        let mut accepted = 0;
        for cookie in cookies {
            let param = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .build();
            let param = match param {
                Ok(p) => p,
                Err(e) => {
                    warn!("skipping malformed cookie {}: {e}", cookie.name);
                    continue;
                }
            };
            match self.page.set_cookie(param).await {
                Ok(_) => accepted += 1,
                Err(e) => warn!("cookie {} rejected for {}: {e}", cookie.name, cookie.domain),
            }
        }

        self.page.reload().await.map_err(cdp("reload failed"))?;
        Ok(accepted)
    }

    async fn close(self: Box<Self>) -> HarvestResult<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
