//! Education entries from the profile document.

use crate::extraction::dates::DateRangeParser;
use crate::extraction::probe::{children_named, clean, parent_of, select_first, text_at};
use crate::model::EducationEntry;
use scraper::ElementRef;

const SCHOOL: &str = "span.hoverable-link-text.t-bold span.visually-hidden";
const DEGREE: &str = "span.t-14.t-normal:not(.t-black--light) span.visually-hidden";
const YEARS: &str = "span.t-14.t-normal.t-black--light span.visually-hidden";

/// The list items of the education section, if the section exists.
fn education_items(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    select_first(root, "div#education")
        .and_then(parent_of)
        .and_then(|section| select_first(section, "ul.pvs-list"))
        .map(|list| children_named(list, "li"))
        .unwrap_or_default()
}

/// Split "Degree, Field of study" on the first comma.
pub fn split_degree(raw: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    match raw.split_once(',') {
        Some((degree, field)) => (clean(degree), clean(field)),
        None => (clean(raw), None),
    }
}

/// Every non-empty education entry, in page order.
pub fn educations(root: ElementRef<'_>, dates: &DateRangeParser<'_>) -> Vec<EducationEntry> {
    education_items(root)
        .into_iter()
        .map(|item| {
            let raw_degree = text_at(item, DEGREE);
            let raw_years = text_at(item, YEARS);
            let (degree, field_of_study) = split_degree(raw_degree.as_deref());
            let range = dates.education(raw_years.as_deref());
            EducationEntry {
                school: text_at(item, SCHOOL),
                degree,
                field_of_study,
                start_month: range.start_month,
                start_year: range.start_year,
                end_month: range.end_month,
                end_year: range.end_year,
                raw_years,
                raw_degree,
            }
        })
        .filter(|entry| !entry.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use scraper::Html;

    const SECTION: &str = r#"
        <section>
          <div id="education" class="pv-profile-card-anchor"></div>
          <ul class="pvs-list ph5 display-flex flex-row flex-wrap">
            <li class="artdeco-list__item pvs-list__item--line-separated">
              <span class="mr1 hoverable-link-text t-bold">
                <span aria-hidden="true">MIT</span><span class="visually-hidden">MIT</span>
              </span>
              <span class="t-14 t-normal">
                <span class="visually-hidden">Master of Science - MS, Computer Science</span>
              </span>
              <span class="t-14 t-normal t-black--light">
                <span class="visually-hidden">2012 - 2014</span>
              </span>
            </li>
            <li class="artdeco-list__item"><div>   </div></li>
            <li class="artdeco-list__item">
              <span class="mr1 hoverable-link-text t-bold">
                <span class="visually-hidden">Lycée Henri-IV</span>
              </span>
              <span class="t-14 t-normal t-black--light">
                <span class="visually-hidden">Sep 2005 - Jun 2008</span>
              </span>
            </li>
          </ul>
        </section>"#;

    #[test]
    fn test_entries_with_degree_split_and_dates() {
        let doc = Html::parse_document(SECTION);
        let sink = MemorySink::new();
        let entries = educations(doc.root_element(), &DateRangeParser::new(&sink, "1"));

        assert_eq!(entries.len(), 2);
        let mit = &entries[0];
        assert_eq!(mit.school.as_deref(), Some("MIT"));
        assert_eq!(mit.degree.as_deref(), Some("Master of Science - MS"));
        assert_eq!(mit.field_of_study.as_deref(), Some("Computer Science"));
        assert_eq!(mit.start_year.as_deref(), Some("2012"));
        assert_eq!(mit.end_year.as_deref(), Some("2014"));
        assert_eq!(mit.raw_years.as_deref(), Some("2012 - 2014"));

        let lycee = &entries[1];
        assert_eq!(lycee.degree, None);
        assert_eq!(lycee.start_month.as_deref(), Some("Sep"));
        assert_eq!(lycee.end_month.as_deref(), Some("Jun"));
        assert_eq!(lycee.end_year.as_deref(), Some("2008"));
    }

    #[test]
    fn test_missing_section_yields_empty_list() {
        let doc = Html::parse_document("<main><h2>About</h2></main>");
        let sink = MemorySink::new();
        assert!(educations(doc.root_element(), &DateRangeParser::new(&sink, "1")).is_empty());
    }
}
