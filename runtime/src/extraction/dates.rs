//! Free-text date range parsing.
//!
//! Two flavors: education ranges ("2014 - 2018" or "Sep 2014 - Jun 2018")
//! and experience ranges ("Jan 2018 - Present · 2 yrs 3 mos"). Absent or
//! digit-free input yields an empty range; odd token counts are reported
//! as `MalformedDate` and leave the affected side empty.

use crate::events::{EventSink, HarvestEvent};
use crate::extraction::probe::clean;
use crate::model::DateRange;

/// Stand-in for any non-ASCII character after normalization.
const SENTINEL: char = '?';

/// Parses date range text for one subject, reporting malformed input to a
/// sink.
pub struct DateRangeParser<'a> {
    sink: &'a dyn EventSink,
    subject: &'a str,
}

/// One side of a range.
#[derive(Debug, Default, PartialEq, Eq)]
struct Side {
    month: Option<String>,
    year: Option<String>,
}

impl<'a> DateRangeParser<'a> {
    pub fn new(sink: &'a dyn EventSink, subject: &'a str) -> Self {
        Self { sink, subject }
    }

    /// Parse an education years string.
    pub fn education(&self, raw: Option<&str>) -> DateRange {
        let Some(text) = raw.and_then(clean) else {
            return DateRange::default();
        };
        if !text.chars().any(|c| c.is_ascii_digit()) {
            return DateRange::default();
        }

        let years_only = text
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == ' ');
        let mut parts = text.splitn(2, '-');
        let start = parts.next().and_then(clean);
        let end = parts.next().and_then(clean);

        if years_only {
            return DateRange {
                start_year: start,
                end_year: end,
                ..Default::default()
            };
        }

        let start = self.side(start.as_deref(), &text);
        let end = self.side(end.as_deref(), &text);
        DateRange {
            start_month: start.month,
            start_year: start.year,
            end_month: end.month,
            end_year: end.year,
            duration: None,
        }
    }

    /// Parse an experience years string.
    pub fn experience(&self, raw: Option<&str>) -> DateRange {
        let Some(raw) = raw else {
            return DateRange::default();
        };
        if !raw.chars().any(|c| c.is_ascii_digit()) {
            return DateRange::default();
        }

        let normalized = normalize(raw);
        let (dates, duration) = match normalized.split_once(SENTINEL) {
            Some((dates, duration)) => (dates, clean(duration)),
            None => (normalized.as_str(), None),
        };

        let pieces: Vec<&str> = dates.split('-').collect();
        if pieces.len() > 2 {
            self.malformed(raw);
        }
        let start = self.side(pieces.first().copied().and_then(non_blank), raw);
        let end = self.side(pieces.get(1).copied().and_then(non_blank), raw);

        DateRange {
            start_month: start.month,
            start_year: start.year,
            end_month: end.month,
            end_year: end.year,
            duration,
        }
    }

    /// "Year" or "Month Year". A lone token is kept verbatim as the year,
    /// which is how "Present" survives.
    fn side(&self, text: Option<&str>, raw: &str) -> Side {
        let Some(text) = text else {
            return Side::default();
        };
        let tokens: Vec<&str> = text.split_whitespace().collect();
        match tokens.as_slice() {
            [] => Side::default(),
            [year] => Side {
                month: None,
                year: Some(year.to_string()),
            },
            [month, year] => Side {
                month: Some(month.to_string()),
                year: Some(year.to_string()),
            },
            _ => {
                self.malformed(raw);
                Side::default()
            }
        }
    }

    fn malformed(&self, raw: &str) {
        self.sink.emit(HarvestEvent::MalformedDate {
            subject: self.subject.to_string(),
            raw: raw.to_string(),
        });
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

/// Map unicode dashes to `-` and every other non-ASCII character to the
/// sentinel.
fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE63}' | '\u{FF0D}' => '-',
            c if c.is_ascii() => c,
            _ => SENTINEL,
        })
        .collect()
}
