//! Probe primitives over parsed documents.
//!
//! A probe is a pure `element -> Option<T>` function. Getters chain probes
//! in order and take the first present value, so a markup mismatch always
//! degrades to `None` instead of an error.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

/// A single extraction attempt rooted at one element.
pub type Probe<'a, T> = fn(ElementRef<'a>) -> Option<T>;

/// Run `probes` in order; the first present value wins.
pub fn first_present<'a, T>(scope: ElementRef<'a>, probes: &[Probe<'a, T>]) -> Option<T> {
    probes.iter().find_map(|probe| probe(scope))
}

/// Collapse internal whitespace runs and trim. Empty text is absent.
pub fn clean(text: &str) -> Option<String> {
    static WS: OnceLock<Regex> = OnceLock::new();
    let re = WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"));
    let collapsed = re.replace_all(text.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Cleaned text content of an element.
pub fn text_of(el: ElementRef<'_>) -> Option<String> {
    clean(&el.text().collect::<String>())
}

/// First descendant of `scope` matching `css`.
pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    let found = scope.select(&sel).next();
    found
}

/// Every descendant of `scope` matching `css`, in document order.
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => scope.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// Cleaned text of the first descendant matching `css`.
pub fn text_at(scope: ElementRef<'_>, css: &str) -> Option<String> {
    select_first(scope, css).and_then(text_of)
}

/// Trimmed attribute of the first descendant matching `css`.
pub fn attr_at(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    select_first(scope, css)
        .and_then(|el| el.value().attr(attr))
        .and_then(clean)
}

/// Direct element children of `parent` named `tag`.
pub fn children_named<'a>(parent: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == tag)
        .collect()
}

/// The parent element, if any.
pub fn parent_of(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

/// First descendant of `scope` matching `css` that does not sit inside an
/// element matching `excluded` (between it and `scope`).
pub fn first_outside<'a>(
    scope: ElementRef<'a>,
    css: &str,
    excluded: &str,
) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    let fence = Selector::parse(excluded).ok()?;
    let found = scope.select(&sel).find(|candidate| {
        !candidate
            .ancestors()
            .take_while(|node| node.id() != scope.id())
            .filter_map(ElementRef::wrap)
            .any(|anc| fence.matches(&anc))
    });
    found
}
