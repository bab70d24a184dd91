//! Record/replay browser for driving acquisition logic without Chromium.
//!
//! Pages are scripted as `url → html`. Landmark waits succeed when the
//! current document contains a matching element and time out otherwise, so
//! the real selectors are exercised. Every interaction is recorded for
//! inspection through a shared [`ReplayHandle`].

use super::{Keystroke, NavigableBrowser, Renderer, TrustCookie};
use crate::error::{HarvestError, HarvestResult};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Scripted pages and the interaction log.
#[derive(Debug, Default)]
pub struct ReplayState {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    failing: HashSet<String>,
    click_landings: HashMap<String, VecDeque<String>>,
    location: String,
    pub navigations: Vec<String>,
    pub typed: HashMap<String, Vec<Keystroke>>,
    pub clicks: Vec<String>,
    pub scrolls: Vec<(String, usize)>,
    pub cookies: Vec<TrustCookie>,
    pub contexts_opened: usize,
    pub contexts_closed: usize,
}

impl ReplayState {
    fn current_html(&self) -> &str {
        self.pages
            .get(&self.location)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Text currently in the input matched by `selector`.
    pub fn field_text(&self, selector: &str) -> String {
        self.typed
            .get(selector)
            .map(|keys| crate::stealth::behavior::apply_keystrokes(keys))
            .unwrap_or_default()
    }
}

/// Shared handle used to script pages and inspect what happened.
#[derive(Debug, Clone, Default)]
pub struct ReplayHandle {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state for inspection.
    pub fn state(&self) -> MutexGuard<'_, ReplayState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Serve `html` at `url`.
    pub fn page(&self, url: &str, html: &str) -> &Self {
        self.state().pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigating to `from` lands on `to`.
    pub fn redirect(&self, from: &str, to: &str) -> &Self {
        self.state()
            .redirects
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Navigating to `url` fails at the transport level.
    pub fn fail(&self, url: &str) -> &Self {
        self.state().failing.insert(url.to_string());
        self
    }

    /// The next click on `selector` lands on `location`. Queued in order.
    pub fn on_click(&self, selector: &str, location: &str) -> &Self {
        self.state()
            .click_landings
            .entry(selector.to_string())
            .or_default()
            .push_back(location.to_string());
        self
    }

    /// A browsing context over this script.
    pub fn browser(&self) -> ReplayBrowser {
        self.state().contexts_opened += 1;
        ReplayBrowser {
            state: Arc::clone(&self.state),
        }
    }

    /// A renderer whose contexts all share this script.
    pub fn renderer(&self) -> ReplayRenderer {
        ReplayRenderer {
            handle: self.clone(),
        }
    }
}

fn matches(html: &str, selector: &str) -> HarvestResult<Vec<String>> {
    let sel = Selector::parse(selector)
        .map_err(|e| HarvestError::Browser(format!("bad selector `{selector}`: {e}")))?;
    let doc = Html::parse_document(html);
    Ok(doc
        .select(&sel)
        .map(|el| el.text().collect::<String>())
        .collect())
}

/// Renderer handing out replay contexts.
pub struct ReplayRenderer {
    handle: ReplayHandle,
}

#[async_trait]
impl Renderer for ReplayRenderer {
    async fn new_context(&self) -> HarvestResult<Box<dyn NavigableBrowser>> {
        Ok(Box::new(self.handle.browser()))
    }

    async fn shutdown(&self) -> HarvestResult<()> {
        Ok(())
    }
}

/// A scripted browsing context.
pub struct ReplayBrowser {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayBrowser {
    fn lock(&self) -> MutexGuard<'_, ReplayState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl NavigableBrowser for ReplayBrowser {
    async fn navigate(&mut self, url: &str) -> HarvestResult<()> {
        let mut state = self.lock();
        state.navigations.push(url.to_string());
        if state.failing.contains(url) {
            return Err(HarvestError::Browser(format!("net::ERR_CONNECTION_RESET at {url}")));
        }
        let landed = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        state.location = landed;
        Ok(())
    }

    async fn current_location(&self) -> HarvestResult<String> {
        Ok(self.lock().location.clone())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> HarvestResult<()> {
        let found = {
            let state = self.lock();
            !matches(state.current_html(), selector)?.is_empty()
        };
        if found {
            Ok(())
        } else {
            Err(HarvestError::Timeout {
                selector: selector.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn raw_document(&self) -> HarvestResult<String> {
        Ok(self.lock().current_html().to_string())
    }

    async fn type_key(&mut self, selector: &str, key: Keystroke) -> HarvestResult<()> {
        let mut state = self.lock();
        if matches(state.current_html(), selector)?.is_empty() {
            return Err(HarvestError::Browser(format!("input `{selector}` not found")));
        }
        state
            .typed
            .entry(selector.to_string())
            .or_default()
            .push(key);
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> HarvestResult<()> {
        let mut state = self.lock();
        if matches(state.current_html(), selector)?.is_empty() {
            return Err(HarvestError::Browser(format!("click target `{selector}` not found")));
        }
        state.clicks.push(selector.to_string());
        let next = state
            .click_landings
            .get_mut(selector)
            .and_then(VecDeque::pop_front);
        if let Some(location) = next {
            state.location = location;
        }
        Ok(())
    }

    async fn click_containing_text(&mut self, selector: &str, text: &str) -> HarvestResult<()> {
        let mut state = self.lock();
        let hit = matches(state.current_html(), selector)?
            .iter()
            .any(|t| t.contains(text));
        if !hit {
            return Err(HarvestError::Browser(format!(
                "no `{selector}` containing {text:?}"
            )));
        }
        state.clicks.push(format!("{selector}::{text}"));
        Ok(())
    }

    async fn count(&self, selector: &str) -> HarvestResult<usize> {
        let state = self.lock();
        Ok(matches(state.current_html(), selector)?.len())
    }

    async fn scroll_into_view(&mut self, selector: &str, index: usize) -> HarvestResult<()> {
        let mut state = self.lock();
        if index >= matches(state.current_html(), selector)?.len() {
            return Err(HarvestError::Browser(format!(
                "no `{selector}` at index {index}"
            )));
        }
        state.scrolls.push((selector.to_string(), index));
        Ok(())
    }

    async fn replace_cookies(&mut self, cookies: &[TrustCookie]) -> HarvestResult<usize> {
        let mut state = self.lock();
        state.cookies = cookies.to_vec();
        Ok(cookies.len())
    }

    async fn close(self: Box<Self>) -> HarvestResult<()> {
        self.lock().contexts_closed += 1;
        Ok(())
    }
}
