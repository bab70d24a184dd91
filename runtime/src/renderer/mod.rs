//! Browser capability used by the acquisition layer.
//!
//! Defines the `Renderer` and `NavigableBrowser` traits that abstract over
//! the browser engine (Chromium via chromiumoxide in production, a
//! record/replay fake in tests).

pub mod chromium;
pub mod replay;

use crate::error::HarvestResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single key press sent to a focused input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Char(char),
    Backspace,
    Enter,
}

/// A pre-seeded cookie that marks the browser as previously trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// A browser engine that can create browsing contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browsing context (tab) with a clean cookie jar.
    async fn new_context(&self) -> HarvestResult<Box<dyn NavigableBrowser>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> HarvestResult<()>;
}

/// One browsing context, driven by a single control flow.
#[async_trait]
pub trait NavigableBrowser: Send + Sync {
    /// Navigate to a URL.
    async fn navigate(&mut self, url: &str) -> HarvestResult<()>;
    /// The current location after any redirects.
    async fn current_location(&self) -> HarvestResult<String>;
    /// Wait until an element matching `selector` is present.
    ///
    /// Fails with `HarvestError::Timeout` once `timeout` elapses.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> HarvestResult<()>;
    /// The serialized document as currently rendered.
    async fn raw_document(&self) -> HarvestResult<String>;

    /// Send one key press to the first element matching `selector`.
    async fn type_key(&mut self, selector: &str, key: Keystroke) -> HarvestResult<()>;
    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> HarvestResult<()>;
    /// Click the first element matching `selector` whose text contains `text`.
    async fn click_containing_text(&mut self, selector: &str, text: &str) -> HarvestResult<()>;
    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> HarvestResult<usize>;
    /// Scroll the `index`-th element matching `selector` into the viewport center.
    async fn scroll_into_view(&mut self, selector: &str, index: usize) -> HarvestResult<()>;
    /// Replace the cookie jar with `cookies`, then reload the page.
    ///
    /// Returns the number of cookies the browser accepted.
    async fn replace_cookies(&mut self, cookies: &[TrustCookie]) -> HarvestResult<usize>;
    /// Close this context.
    async fn close(self: Box<Self>) -> HarvestResult<()>;
}
