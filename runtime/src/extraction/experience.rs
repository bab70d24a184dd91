//! Experience entries from the experience detail document.
//!
//! Two shapes occur. A flat item is one role at one company. A collapsed
//! item is a company group: the header names the company once and a nested
//! paged sub-list holds one item per role, each with its own dates and
//! description.

use crate::extraction::dates::DateRangeParser;
use crate::extraction::probe::{
    attr_at, children_named, first_outside, select_all, select_first, text_at, text_of,
};
use crate::model::ExperienceEntry;
use scraper::ElementRef;
use url::Url;

const SUB_ITEM: &str = "li.pvs-list__paged-list-item";
const GROUP_COMPANY: &str = "span.hoverable-link-text.t-bold span[aria-hidden='true']";
const GROUP_TITLE: &str = "span.t-14.t-normal:not(.t-black--light) span[aria-hidden='true']";
const FLAT_INFO: &str = "div.display-flex.flex-column.full-width.align-self-center";
const FLAT_COMPANY: &str = "span.t-14.t-normal:not(.t-black--light) span[aria-hidden='true']";
const FLAT_TITLE: &str = "span.mr1.t-bold:not(.hoverable-link-text) span.visually-hidden";
const YEARS: &str = "span.t-14.t-normal.t-black--light span.visually-hidden";
const DESCRIPTION: &str = "div.pvs-list__outer-container span.visually-hidden";
const LOGO_LINKS: [&str; 2] = [
    "a.optional-action-target-wrapper.display-flex",
    "a.optional-action-target-wrapper",
];

/// Numeric company id from a logo link.
///
/// The link must point at a `company` page, never a search action; the id is
/// the last non-empty path segment.
pub fn parse_company_id(href: &str, base_url: &str) -> Option<u64> {
    if href.contains("search") {
        return None;
    }
    let url = Url::parse(base_url).ok()?.join(href.trim()).ok()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    if segments.first() != Some(&"company") || segments.len() < 2 {
        return None;
    }
    segments.last()?.trim().parse().ok()
}

fn company_id(item: ElementRef<'_>, base_url: &str) -> Option<u64> {
    let href = LOGO_LINKS
        .iter()
        .find_map(|css| attr_at(item, css, "href"))?;
    parse_company_id(&href, base_url)
}

/// Description text, dropping the skills summary the site renders there.
fn description(scope: ElementRef<'_>) -> Option<String> {
    text_at(scope, DESCRIPTION).filter(|desc| {
        let label = desc.split_once(':').map_or(desc.as_str(), |(label, _)| label);
        label.trim() != "Skills"
    })
}

fn entry(
    company: Option<String>,
    company_id: Option<u64>,
    title: Option<String>,
    scope: ElementRef<'_>,
    dates: &DateRangeParser<'_>,
) -> ExperienceEntry {
    let raw_years = text_at(scope, YEARS);
    let range = dates.experience(raw_years.as_deref());
    ExperienceEntry {
        company,
        company_id,
        title,
        description: description(scope),
        start_month: range.start_month,
        start_year: range.start_year,
        end_month: range.end_month,
        end_year: range.end_year,
        duration: range.duration,
        raw_years,
    }
}

/// Every non-empty experience entry, in page order.
pub fn experiences(
    root: ElementRef<'_>,
    base_url: &str,
    dates: &DateRangeParser<'_>,
) -> Vec<ExperienceEntry> {
    let Some(list) = select_first(root, "div.pvs-list__container ul.pvs-list") else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for item in children_named(list, "li") {
        let id = company_id(item, base_url);
        let roles = select_all(item, SUB_ITEM);

        if roles.is_empty() {
            let info = select_first(item, FLAT_INFO).unwrap_or(item);
            entries.push(entry(
                text_at(info, FLAT_COMPANY),
                id,
                text_at(info, FLAT_TITLE),
                info,
                dates,
            ));
        } else {
            let company = first_outside(item, GROUP_COMPANY, SUB_ITEM).and_then(text_of);
            let title = first_outside(item, GROUP_TITLE, SUB_ITEM).and_then(text_of);
            for role in roles {
                entries.push(entry(company.clone(), id, title.clone(), role, dates));
            }
        }
    }

    entries.retain(|e| !e.is_empty());
    entries
}
