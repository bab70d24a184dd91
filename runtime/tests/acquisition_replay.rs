//! Acquisition flows driven end to end through the replay browser.
//!
//! Covers the profile crawl (captured / not found / abandoned / resume) and
//! the paginated company search (sentinel, pagination, page cap).

use harvest_runtime::acquisition::{RateGovernor, SessionAuthenticator};
use harvest_runtime::config::{CrawlConfig, LoginConfig, SearchConfig, SiteConfig};
use harvest_runtime::crawl::{CaptureStore, CrawlOrchestrator, PaginatedSearchCrawler};
use harvest_runtime::events::{HarvestEvent, MemorySink};
use harvest_runtime::model::{Account, FilterKey, MembershipKind, Subject, Tenure};
use harvest_runtime::renderer::replay::ReplayHandle;
use harvest_runtime::stealth::behavior::{DelayRange, FixedDelay};
use std::sync::Arc;
use std::time::Duration;

// ── Fixtures ──

const LOGIN_FORM: &str = r#"<form>
    <input id="session_key"><input id="session_password" type="password">
    <button type="submit">Sign in</button></form>"#;

fn account(id: &str) -> Account {
    Account {
        id: id.into(),
        username: format!("user{id}@x.test"),
        password: "secret".into(),
        locale: "us".into(),
        server: "us-1".into(),
    }
}

/// Script the login page so the next `logins` submits succeed.
fn script_login(handle: &ReplayHandle, site: &SiteConfig, logins: usize) {
    handle.page(&site.login_url, LOGIN_FORM);
    for _ in 0..logins {
        handle.on_click(&site.submit_button, &site.landing_url);
    }
}

fn authenticator(handle: &ReplayHandle, sink: Arc<MemorySink>) -> SessionAuthenticator {
    SessionAuthenticator::new(
        Arc::new(handle.renderer()),
        Arc::new(FixedDelay),
        sink,
        SiteConfig::default(),
        LoginConfig::default(),
    )
}

fn governor() -> Arc<RateGovernor> {
    Arc::new(RateGovernor::new(45, Duration::from_secs(3_600)).unwrap())
}

// ── Profile crawl ──

#[tokio::test(start_paused = true)]
async fn crawl_separates_captured_not_found_and_abandoned() {
    let site = SiteConfig::default();
    let handle = ReplayHandle::new();
    script_login(&handle, &site, 1);

    handle
        .page("https://site.test/in/one", r#"<section id="experience"></section>"#)
        .page(
            "https://site.test/in/one/details/experience/",
            r#"<main id="profile-content"></main>"#,
        )
        .redirect("https://site.test/in/two", &site.not_found_url)
        .page(&site.not_found_url, "<h1>This page doesn't exist</h1>")
        .page("https://site.test/in/three", "<p>still loading</p>");

    let dir = tempfile::tempdir().unwrap();
    let store = CaptureStore::new(dir.path().join("profile"), dir.path().join("detail"));
    store.persist("4", "<html>old</html>", "<html>old</html>").unwrap();

    let sink = Arc::new(MemorySink::new());
    let orchestrator = CrawlOrchestrator::new(
        Arc::new(authenticator(&handle, sink.clone())),
        governor(),
        store.clone(),
        Arc::new(FixedDelay),
        sink.clone(),
        site.clone(),
        CrawlConfig::default(),
    );

    let subjects = vec![
        Subject::new("1", "https://site.test/in/one"),
        Subject::new("2", "https://site.test/in/two"),
        Subject::new("3", "https://site.test/in/three"),
        Subject::new("4", "https://site.test/in/four"),
    ];
    let summary = orchestrator
        .visit_all(subjects, &[account("a")])
        .await
        .unwrap();

    assert_eq!(summary.captured, 1);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.abandoned_ids, vec!["3".to_string()]);

    let (profile, detail) = store.load("1").unwrap().unwrap();
    assert!(profile.contains("experience"));
    assert!(detail.contains("profile-content"));
    assert!(!store.is_captured("2"));
    assert!(!store.is_captured("3"));

    let events = sink.events();
    assert!(events.contains(&HarvestEvent::NotFound { subject: "2".into() }));
    assert!(events.contains(&HarvestEvent::AlreadyCaptured { subject: "4".into() }));
    assert!(events
        .iter()
        .any(|e| matches!(e, HarvestEvent::Abandoned { subject, .. } if subject == "3")));

    // The already-captured subject is never visited.
    let state = handle.state();
    assert!(!state.navigations.iter().any(|u| u.contains("/in/four")));
    assert_eq!(state.contexts_opened, 1);
    assert_eq!(state.contexts_closed, 1);
}

#[tokio::test(start_paused = true)]
async fn crawl_recaptures_subject_after_interrupted_persist() {
    let site = SiteConfig::default();
    let handle = ReplayHandle::new();
    script_login(&handle, &site, 2);
    handle
        .page("https://site.test/in/one", r#"<section id="experience"></section>"#)
        .page(
            "https://site.test/in/one/details/experience/",
            r#"<main id="profile-content"></main>"#,
        );

    let dir = tempfile::tempdir().unwrap();
    let store = CaptureStore::new(dir.path().join("profile"), dir.path().join("detail"));
    // A directory squatting on the detail path makes the first write fail.
    let blocker = dir.path().join("detail/1.txt");
    std::fs::create_dir_all(&blocker).unwrap();

    let sink = Arc::new(MemorySink::new());
    let orchestrator = CrawlOrchestrator::new(
        Arc::new(authenticator(&handle, sink.clone())),
        governor(),
        store.clone(),
        Arc::new(FixedDelay),
        sink,
        site,
        CrawlConfig::default(),
    );
    let subjects = || vec![Subject::new("1", "https://site.test/in/one")];

    let first = orchestrator.visit_all(subjects(), &[account("a")]).await.unwrap();
    assert_eq!(first.abandoned, 1);
    assert!(!store.is_captured("1"));

    std::fs::remove_dir(&blocker).unwrap();
    let second = orchestrator.visit_all(subjects(), &[account("a")]).await.unwrap();
    assert_eq!(second.skipped, 0);
    assert_eq!(second.captured, 1);
    assert!(store.load("1").unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn crawl_aborts_when_login_keeps_failing() {
    let site = SiteConfig::default();
    let handle = ReplayHandle::new();
    handle.page(&site.login_url, LOGIN_FORM);
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());

    let orchestrator = CrawlOrchestrator::new(
        Arc::new(authenticator(&handle, sink.clone())),
        governor(),
        CaptureStore::new(dir.path().join("p"), dir.path().join("d")),
        Arc::new(FixedDelay),
        sink,
        site,
        CrawlConfig::default(),
    );
    let result = orchestrator
        .visit_all(vec![Subject::new("1", "https://site.test/in/one")], &[account("a")])
        .await;

    assert!(result.is_err());
    assert!(handle.state().navigations.iter().all(|u| !u.contains("/in/one")));
}

#[tokio::test(start_paused = true)]
async fn crawl_without_accounts_is_a_config_error() {
    let handle = ReplayHandle::new();
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let orchestrator = CrawlOrchestrator::new(
        Arc::new(authenticator(&handle, sink.clone())),
        governor(),
        CaptureStore::new(dir.path().join("p"), dir.path().join("d")),
        Arc::new(FixedDelay),
        sink,
        SiteConfig::default(),
        CrawlConfig::default(),
    );

    let err = orchestrator.visit_all(Vec::new(), &[]).await.unwrap_err();
    assert!(matches!(
        err,
        harvest_runtime::error::HarvestError::Config(_)
    ));
}

// ── Company search ──

const FILTER_UI: &str = r#"
    <button aria-label="Expand filter panel">Filters</button>
    <button aria-label="Clear all filter values">Clear all</button>
    <button>Expand Current Company filter</button>
    <button>Expand Past Company filter</button>
    <input placeholder="Add current companies">
    <input placeholder="Add past companies">"#;

const SUGGESTION: &str = r#"
    <ul aria-label="Add current companies" role="listbox">
      <li aria-selected="false">
        <button aria-label="Include Acme" title="Include &#8220;Acme Inc&#8221; in current companies">Acme Inc</button>
      </li>
    </ul>"#;

fn result_page(rows: &[(&str, &str)], next: &str) -> String {
    let items: String = rows
        .iter()
        .map(|(name, href)| {
            format!(
                r#"<li class="artdeco-list__item">
                     <a data-control-name="view_lead_panel_via_search_lead_name" href="{href}">
                       <span data-anonymize="person-name">{name}</span></a></li>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>{FILTER_UI}{SUGGESTION}
           <div id="search-results-container"><ol>{items}
             <li class="artdeco-list__item"><div>Promoted</div></li>
           </ol></div>{next}</body></html>"#
    )
}

async fn search_crawler(
    handle: &ReplayHandle,
    sink: Arc<MemorySink>,
    search: SearchConfig,
) -> PaginatedSearchCrawler {
    let site = SiteConfig::default();
    script_login(handle, &site, 1);
    let session = authenticator(handle, sink.clone())
        .acquire(&account("s"))
        .await
        .unwrap();
    PaginatedSearchCrawler::new(
        session,
        governor(),
        Arc::new(FixedDelay),
        sink,
        site,
        search,
        DelayRange::new(10, 20),
    )
}

#[tokio::test(start_paused = true)]
async fn search_walks_pages_until_next_is_disabled() {
    let site = SiteConfig::default();
    let handle = ReplayHandle::new();
    handle
        .page(
            &site.search_url,
            &result_page(
                &[("Ada Byron", "/sales/lead/ACw1,NAME")],
                r#"<button aria-label="Next">Next</button>"#,
            ),
        )
        .page(
            &format!("{}?page=2", site.search_url),
            &result_page(
                &[("Alan Turing", "/sales/lead/ACw2,NAME")],
                r#"<button aria-label="Next" disabled>Next</button>"#,
            ),
        );
    let sink = Arc::new(MemorySink::new());
    let mut crawler = search_crawler(&handle, sink.clone(), SearchConfig::default()).await;

    crawler.initialize().await.unwrap();
    let filter = FilterKey::new("Acme", Tenure::Current);
    let searched = crawler.apply_filter(&filter).await.unwrap();
    assert_eq!(searched, "Acme Inc");

    let records = crawler.collect(&filter, &searched).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.kind == MembershipKind::Member));
    assert!(records.iter().all(|r| r.currently_at_company));
    assert_eq!(records[0].name.as_deref(), Some("Ada Byron"));
    assert_eq!(
        records[1].lead_url.as_deref(),
        Some("https://www.linkedin.com/sales/lead/ACw2,NAME")
    );
    assert_eq!(records[0].searched_company.as_deref(), Some("Acme Inc"));

    let state = handle.state();
    assert_eq!(state.field_text("[placeholder='Add current companies']"), "Acme");
    assert!(state
        .navigations
        .iter()
        .any(|u| u.ends_with("/sales/search/people?page=2")));
    assert!(!state.navigations.iter().any(|u| u.contains("page=3")));
    drop(state);

    let skipped = sink
        .events()
        .iter()
        .filter(|e| matches!(e, HarvestEvent::RowSkipped { .. }))
        .count();
    assert_eq!(skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn search_with_no_matches_yields_one_sentinel_per_tenure() {
    let site = SiteConfig::default();
    let handle = ReplayHandle::new();
    handle.page(
        &site.search_url,
        &format!("<html><body>{FILTER_UI}<p>No leads matched your search</p></body></html>"),
    );
    let sink = Arc::new(MemorySink::new());
    let mut crawler = search_crawler(&handle, sink, SearchConfig::default()).await;

    crawler.initialize().await.unwrap();
    let records = crawler.visit_company("Nobody Ltd").await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_sentinel()));
    assert!(records[0].currently_at_company);
    assert!(!records[1].currently_at_company);
    assert!(records.iter().all(|r| r.input_company == "Nobody Ltd"));

    let state = handle.state();
    assert_eq!(state.field_text("[placeholder='Add past companies']"), "Nobody Ltd");
    assert_eq!(
        state
            .clicks
            .iter()
            .filter(|c| c.as_str() == "[aria-label='Clear all filter values']")
            .count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn search_stops_at_the_page_cap() {
    let site = SiteConfig::default();
    let handle = ReplayHandle::new();
    let endless = result_page(
        &[("Grace Hopper", "/sales/lead/ACw9,NAME")],
        r#"<button aria-label="Next">Next</button>"#,
    );
    handle.page(&site.search_url, &endless);
    for page in 2..=5 {
        handle.page(&format!("{}?page={page}", site.search_url), &endless);
    }
    let search = SearchConfig {
        max_pages: 3,
        ..SearchConfig::default()
    };
    let mut crawler = search_crawler(&handle, Arc::new(MemorySink::new()), search).await;

    crawler.initialize().await.unwrap();
    let filter = FilterKey::new("Acme", Tenure::Current);
    let searched = crawler.apply_filter(&filter).await.unwrap();
    let records = crawler.collect(&filter, &searched).await.unwrap();

    assert_eq!(records.len(), 3);
    let state = handle.state();
    assert!(state.navigations.iter().any(|u| u.ends_with("page=3")));
    assert!(!state.navigations.iter().any(|u| u.ends_with("page=4")));
}

/// Indices scrolled into view while collecting one results page.
async fn scroll_order(safe_mode: bool) -> Vec<usize> {
    let site = SiteConfig::default();
    let handle = ReplayHandle::new();
    handle.page(
        &site.search_url,
        &result_page(
            &[
                ("Ada Byron", "/sales/lead/ACw1,NAME"),
                ("Alan Turing", "/sales/lead/ACw2,NAME"),
            ],
            r#"<button aria-label="Next" disabled>Next</button>"#,
        ),
    );
    let search = SearchConfig {
        safe_mode,
        ..SearchConfig::default()
    };
    let mut crawler = search_crawler(&handle, Arc::new(MemorySink::new()), search).await;

    crawler.initialize().await.unwrap();
    let filter = FilterKey::new("Acme", Tenure::Current);
    let searched = crawler.apply_filter(&filter).await.unwrap();
    crawler.collect(&filter, &searched).await.unwrap();

    let state = handle.state();
    let order = state
        .scrolls
        .iter()
        .filter(|(selector, _)| selector == "#search-results-container li.artdeco-list__item")
        .map(|(_, index)| *index)
        .collect();
    order
}

#[tokio::test(start_paused = true)]
async fn search_safe_mode_scrolls_rows_down_then_back_up() {
    assert_eq!(scroll_order(true).await, vec![0, 1, 2, 2, 1, 0]);
}

#[tokio::test(start_paused = true)]
async fn search_scrolls_rows_forward_only_without_safe_mode() {
    assert_eq!(scroll_order(false).await, vec![0, 1, 2]);
}
