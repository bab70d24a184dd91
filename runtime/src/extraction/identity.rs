//! Identity fields from the profile document: name, headline, location,
//! and the headshot link.

use crate::extraction::probe::{attr_at, clean, first_present, select_all, text_at, text_of, Probe};
use scraper::ElementRef;

/// Tokens stripped from the "connect" call-to-action to recover a name.
const CONNECT_STOPWORDS: &[&str] = &["Invite", "to", "connect"];

fn name_from_title(root: ElementRef<'_>) -> Option<String> {
    text_at(
        root,
        "div.mt2.relative div.pv-text-details__left-panel h1.text-heading-xlarge",
    )
}

fn name_from_connect(root: ElementRef<'_>) -> Option<String> {
    let label = select_all(root, "div.pvs-profile-actions button")
        .into_iter()
        .filter_map(text_of)
        .find(|text| text.to_lowercase().contains("connect"))?;
    let kept: Vec<&str> = label
        .split(' ')
        .filter(|word| !CONNECT_STOPWORDS.contains(word))
        .collect();
    clean(&kept.join(" "))
}

/// Person's display name.
pub fn name(root: ElementRef<'_>) -> Option<String> {
    let probes: [Probe<'_, String>; 2] = [
        |el| name_from_title(el),
        |el| name_from_connect(el),
    ];
    first_present(root, &probes)
}

/// One-line headline under the top card.
pub fn headline(root: ElementRef<'_>) -> Option<String> {
    text_at(root, "div.mt2.relative div.text-body-medium.break-words")
}

/// Raw comma-separated location string.
pub fn location(root: ElementRef<'_>) -> Option<String> {
    text_at(
        root,
        "div.mt2.relative div.pv-text-details__left-panel.pb2 \
         span.text-body-small.inline.t-black--light.break-words",
    )
}

/// City, state and country in that order. Missing segments are absent.
pub fn split_location(raw: Option<&str>) -> (Option<String>, Option<String>, Option<String>) {
    let Some(raw) = raw else {
        return (None, None, None);
    };
    let mut parts = raw.split(',').map(clean);
    let city = parts.next().flatten();
    let state = parts.next().flatten();
    let country = parts.next().flatten();
    (city, state, country)
}

/// `src` of the sticky-header image.
pub fn headshot_link(root: ElementRef<'_>) -> Option<String> {
    attr_at(root, "div.pv-profile-sticky-header-v2__container img", "src")
}
