//! Paginated people-search crawl producing membership records.
//!
//! A company filter (current or past tenure) is applied through the search
//! page's filter panel, then every result page is walked. Rows render
//! lazily, so each one is scrolled into view before the document is read.
//! The walk ends when the results banner says nothing matched, when the
//! "Next" control is missing, or when it is disabled.

use crate::acquisition::{RateGovernor, Session};
use crate::config::{SearchConfig, SiteConfig};
use crate::error::{HarvestError, HarvestResult};
use crate::events::{EventSink, HarvestEvent};
use crate::model::{FilterKey, MembershipRecord, Tenure};
use crate::renderer::Keystroke;
use crate::stealth::behavior::{self, pause, DelayModel, DelayRange};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

const NO_RESULTS_BANNER: &str = "No leads matched your search";
const EXPAND_PANEL: &str = "[aria-label='Expand filter panel']";
const CLEAR_FILTERS: &str = "[aria-label='Clear all filter values']";
const NEXT_BUTTON: &str = "button[aria-label='Next']";
const RESULT_ROW: &str = "#search-results-container li.artdeco-list__item";
const LEAD_ACTIONS: &str = "section[data-x--lead-actions-bar='']";
const LEAD_OVERFLOW: &str =
    "section[data-x--lead-actions-bar=''] button[data-x--lead-actions-bar-overflow-menu='']";
const LEAD_MENU_LINK: &str = "div#hue-web-menu-outlet a[href^='https']";

/// One result row: the person's name and the lead page locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub name: Option<String>,
    pub lead_url: String,
}

/// Walks filtered search results through one authenticated session.
pub struct PaginatedSearchCrawler {
    session: Session,
    governor: Arc<RateGovernor>,
    delays: Arc<dyn DelayModel>,
    sink: Arc<dyn EventSink>,
    site: SiteConfig,
    search: SearchConfig,
    keystroke: DelayRange,
}

impl PaginatedSearchCrawler {
    pub fn new(
        session: Session,
        governor: Arc<RateGovernor>,
        delays: Arc<dyn DelayModel>,
        sink: Arc<dyn EventSink>,
        site: SiteConfig,
        search: SearchConfig,
        keystroke: DelayRange,
    ) -> Self {
        Self {
            session,
            governor,
            delays,
            sink,
            site,
            search,
            keystroke,
        }
    }

    /// Give the session back, e.g. to close it.
    pub fn into_session(self) -> Session {
        self.session
    }

    async fn charge(&self) {
        let consumer = self.session.account().id.clone();
        let waited = self.governor.check(&consumer).await;
        if !waited.is_zero() {
            self.sink.emit(HarvestEvent::Throttled {
                consumer,
                waited_ms: waited.as_millis() as u64,
            });
        }
    }

    /// Open the search page and expand its filter panel.
    pub async fn initialize(&mut self) -> HarvestResult<()> {
        self.charge().await;
        let timeout = self.search.landmark_timeout();
        let browser = self.session.browser_mut();
        browser.navigate(&self.site.search_url).await?;
        browser.wait_for(EXPAND_PANEL, timeout).await?;
        pause(self.delays.as_ref(), self.search.filter_settle).await;
        browser.click(EXPAND_PANEL).await
    }

    /// Filter by company and tenure.
    ///
    /// Returns the company name the site resolved the input to: the first
    /// autocomplete suggestion when one is offered, else the input itself.
    pub async fn apply_filter(&mut self, filter: &FilterKey) -> HarvestResult<String> {
        let label = filter.tenure.label();
        let kw = filter.tenure.keyword();
        let input = format!("[placeholder='Add {kw} companies']");
        let suggestion = format!(
            "ul[aria-label='Add {kw} companies'][role='listbox'] \
             li[aria-selected='false'] button[aria-label^='Include']"
        );
        let timeout = self.search.landmark_timeout();
        let delays = Arc::clone(&self.delays);
        let browser = self.session.browser_mut();

        browser
            .click_containing_text("button", &format!("Expand {label} Company filter"))
            .await?;
        browser.wait_for(&input, timeout).await?;
        pause(delays.as_ref(), self.search.filter_settle).await;

        let keys = behavior::plain_keystrokes(&filter.company);
        behavior::human_type(browser, &input, &keys, delays.as_ref(), self.keystroke).await?;

        if browser.count(&suggestion).await? > 0 {
            let doc = browser.raw_document().await?;
            let searched = first_attr(&doc, &suggestion, "title")
                .as_deref()
                .and_then(suggested_company)
                .unwrap_or_else(|| filter.company.clone());
            browser.click(&suggestion).await?;
            Ok(searched)
        } else {
            browser.type_key(&input, Keystroke::Enter).await?;
            Ok(filter.company.clone())
        }
    }

    /// Collect every result row for the filter currently applied.
    ///
    /// A filter that matches nobody yields exactly one `NoMatches` record.
    pub async fn collect(
        &mut self,
        filter: &FilterKey,
        searched_company: &str,
    ) -> HarvestResult<Vec<MembershipRecord>> {
        let first_page = self.session.browser().current_location().await?;
        let (path, query) = match first_page.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (first_page.clone(), None),
        };

        self.charge().await;
        pause(self.delays.as_ref(), self.search.page_settle).await;
        let doc = self.session.browser().raw_document().await?;
        if !results_exist(&doc) {
            info!("{}: no {} members", filter.company, filter.tenure.keyword());
            return Ok(vec![MembershipRecord::no_matches(filter)]);
        }

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            if page >= 2 {
                self.charge().await;
                let url = page_url(&path, query.as_deref(), page);
                let timeout = self.search.landmark_timeout();
                let browser = self.session.browser_mut();
                browser.navigate(&url).await?;
                if let Err(e) = browser.wait_for(NEXT_BUTTON, timeout).await {
                    debug!("page {page} never showed the Next control: {e}");
                }
            }

            self.force_render().await?;
            let doc = self.session.browser().raw_document().await?;
            let (rows, skipped) = parse_result_rows(&doc, &self.site.base_url);
            for _ in 0..skipped {
                self.sink.emit(HarvestEvent::RowSkipped {
                    company: filter.company.clone(),
                    page,
                });
            }
            self.sink.emit(HarvestEvent::PageCollected {
                company: filter.company.clone(),
                page,
                rows: rows.len(),
            });
            records.extend(rows.into_iter().map(|row| {
                MembershipRecord::member(filter, searched_company, row.name, row.lead_url)
            }));

            if !pages_left(&doc) {
                break;
            }
            if page >= self.search.max_pages {
                warn!(
                    "{}: stopping at the page cap ({})",
                    filter.company, self.search.max_pages
                );
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    /// Scroll every result row into view so its lazy content renders.
    async fn force_render(&mut self) -> HarvestResult<()> {
        let delays = Arc::clone(&self.delays);
        let browser = self.session.browser_mut();
        let rows = browser.count(RESULT_ROW).await?;

        for i in 0..rows {
            browser.scroll_into_view(RESULT_ROW, i).await?;
            pause(delays.as_ref(), self.search.row_scroll).await;
        }
        pause(delays.as_ref(), self.search.page_settle).await;

        if self.search.safe_mode {
            for i in (0..rows).rev() {
                browser.scroll_into_view(RESULT_ROW, i).await?;
                pause(delays.as_ref(), self.search.row_scroll).await;
            }
            pause(delays.as_ref(), self.search.page_settle).await;
        }
        Ok(())
    }

    /// Remove every applied filter.
    pub async fn clear_filters(&mut self) -> HarvestResult<()> {
        let timeout = self.search.landmark_timeout();
        let browser = self.session.browser_mut();
        browser.wait_for(CLEAR_FILTERS, timeout).await?;
        pause(self.delays.as_ref(), self.search.filter_settle).await;
        browser.click(CLEAR_FILTERS).await
    }

    /// Current members, then past members, of `company`.
    pub async fn visit_company(&mut self, company: &str) -> HarvestResult<Vec<MembershipRecord>> {
        let mut records = Vec::new();
        for tenure in [Tenure::Current, Tenure::Past] {
            let filter = FilterKey::new(company, tenure);
            let searched = self.apply_filter(&filter).await?;
            records.extend(self.collect(&filter, &searched).await?);
            self.clear_filters().await?;
        }
        Ok(records)
    }

    /// Follow a lead page to the person's public profile locator.
    ///
    /// Any missing step yields `None`.
    pub async fn resolve_profile_url(&mut self, lead_url: &str) -> HarvestResult<Option<String>> {
        self.charge().await;
        let timeout = self.search.landmark_timeout();
        let delays = Arc::clone(&self.delays);
        let browser = self.session.browser_mut();

        browser.navigate(lead_url).await?;
        pause(delays.as_ref(), self.search.page_settle).await;
        match browser.wait_for(LEAD_ACTIONS, timeout).await {
            Ok(()) => {}
            Err(HarvestError::Timeout { .. }) => return Ok(None),
            Err(e) => return Err(e),
        }
        if browser.click(LEAD_OVERFLOW).await.is_err() {
            return Ok(None);
        }
        pause(delays.as_ref(), self.search.filter_settle).await;

        let doc = browser.raw_document().await?;
        Ok(first_attr(&doc, LEAD_MENU_LINK, "href"))
    }
}

/// `{path}?page={i}&{query}`, or `{path}?page={i}` without a query.
pub fn page_url(path: &str, query: Option<&str>, page: usize) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?page={page}&{q}"),
        _ => format!("{path}?page={page}"),
    }
}

/// Whether the document lacks the "nothing matched" banner.
pub fn results_exist(doc: &str) -> bool {
    let html = Html::parse_document(doc);
    !html
        .root_element()
        .text()
        .any(|t| t.contains(NO_RESULTS_BANNER))
}

/// Whether another result page follows this one.
pub fn pages_left(doc: &str) -> bool {
    if !results_exist(doc) {
        return false;
    }
    let Ok(next) = Selector::parse(NEXT_BUTTON) else {
        return false;
    };
    let html = Html::parse_document(doc);
    match html.select(&next).next() {
        Some(button) => button.value().attr("disabled").is_none(),
        None => false,
    }
}

/// Result rows with a lead link, plus the count of decorative rows skipped.
pub fn parse_result_rows(doc: &str, base_url: &str) -> (Vec<ResultRow>, usize) {
    let (Ok(row_sel), Ok(link_sel), Ok(name_sel)) = (
        Selector::parse(RESULT_ROW),
        Selector::parse("a[data-control-name='view_lead_panel_via_search_lead_name']"),
        Selector::parse("span[data-anonymize='person-name']"),
    ) else {
        return (Vec::new(), 0);
    };

    let html = Html::parse_document(doc);
    let mut rows = Vec::new();
    let mut skipped = 0;
    for li in html.select(&row_sel) {
        let Some(link) = li.select(&link_sel).next() else {
            skipped += 1;
            continue;
        };
        let Some(href) = link.value().attr("href").map(str::trim) else {
            skipped += 1;
            continue;
        };
        let name = link
            .select(&name_sel)
            .next()
            .map(|n| n.text().collect::<String>().trim().to_string())
            .filter(|n| !n.is_empty());
        let lead_url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{href}", base_url.trim_end_matches('/'))
        };
        rows.push(ResultRow { name, lead_url });
    }
    (rows, skipped)
}

/// The company name quoted in an autocomplete suggestion title.
///
/// Titles read like `Include “Acme Inc” in current companies`; the curly
/// quotes are matched as any non-ASCII character.
pub fn suggested_company(title: &str) -> Option<String> {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let re = QUOTED.get_or_init(|| Regex::new(r"^.*?\?(.*)\?.*").expect("title regex is valid"));
    let ascii: String = title
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect();
    re.captures(&ascii)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_attr(doc: &str, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let html = Html::parse_document(doc);
    let value = html
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string());
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_keeps_query() {
        assert_eq!(
            page_url("https://x.test/sales/search/people", Some("query=abc"), 3),
            "https://x.test/sales/search/people?page=3&query=abc"
        );
        assert_eq!(
            page_url("https://x.test/sales/search/people", None, 2),
            "https://x.test/sales/search/people?page=2"
        );
    }

    #[test]
    fn test_termination_probes() {
        let more = r#"<button aria-label="Next">Next</button>"#;
        let disabled = r#"<button aria-label="Next" disabled>Next</button>"#;
        let none = r#"<p>No leads matched your search</p><button aria-label="Next">Next</button>"#;

        assert!(pages_left(more));
        assert!(!pages_left(disabled));
        assert!(!pages_left("<p>results</p>"));
        assert!(!pages_left(none));
        assert!(!results_exist(none));
        assert!(results_exist(more));
    }

    #[test]
    fn test_rows_without_lead_link_are_skipped() {
        let doc = r#"<div id="search-results-container"><ol>
            <li class="artdeco-list__item">
              <a data-control-name="view_lead_panel_via_search_lead_name"
                 href=" /sales/lead/ACw1,NAME "><span data-anonymize="person-name">Ada Byron</span></a>
            </li>
            <li class="artdeco-list__item"><div>Sponsored</div></li>
            <li class="artdeco-list__item">
              <a data-control-name="view_lead_panel_via_search_lead_name"
                 href="/sales/lead/ACw2,NAME"></a>
            </li></ol></div>"#;

        let (rows, skipped) = parse_result_rows(doc, "https://www.linkedin.com/");
        assert_eq!(skipped, 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name.as_deref(), Some("Ada Byron"));
        assert_eq!(
            rows[0].lead_url,
            "https://www.linkedin.com/sales/lead/ACw1,NAME"
        );
        assert_eq!(rows[1].name, None);
    }

    #[test]
    fn test_nested_list_items_are_not_rows() {
        let doc = r#"<div id="search-results-container"><ol>
            <li class="artdeco-list__item">
              <a data-control-name="view_lead_panel_via_search_lead_name"
                 href="/sales/lead/ACw3,NAME"><span data-anonymize="person-name">Edsger Dijkstra</span></a>
              <ul><li>2nd degree</li><li>Eindhoven</li></ul>
            </li></ol></div>"#;

        let (rows, skipped) = parse_result_rows(doc, "https://www.linkedin.com");
        assert_eq!(rows.len(), 1);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_suggested_company_from_title() {
        assert_eq!(
            suggested_company("Include \u{201c}Acme Holdings\u{201d} in current companies"),
            Some("Acme Holdings".to_string())
        );
        assert_eq!(suggested_company("Include Acme"), None);
    }
}
