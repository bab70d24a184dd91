//! Structured-field extraction from captured documents.
//!
//! Identity, headshot and education come from the profile document;
//! experience comes from the detail document. Every getter degrades to
//! absent on a markup mismatch, so `parse` never fails.

pub mod batch;
pub mod dates;
pub mod education;
pub mod experience;
pub mod headshot;
pub mod identity;
pub mod probe;

pub use batch::{BatchExtractor, BatchSummary};
pub use dates::DateRangeParser;
pub use headshot::HeadshotFetcher;

use crate::events::{EventSink, HarvestEvent};
use crate::model::ExtractionRecord;
use scraper::Html;
use std::sync::Arc;

/// A parsed record plus the headshot link found in the profile document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProfile {
    pub record: ExtractionRecord,
    pub headshot_link: Option<String>,
}

/// Converts captured document pairs into records.
#[derive(Clone)]
pub struct FieldExtractor {
    sink: Arc<dyn EventSink>,
    base_url: String,
}

impl FieldExtractor {
    /// `base_url` resolves relative company links.
    pub fn new(sink: Arc<dyn EventSink>, base_url: impl Into<String>) -> Self {
        Self {
            sink,
            base_url: base_url.into(),
        }
    }

    /// Parse one subject. `image_url` is left absent; it is only set once a
    /// headshot has actually been saved.
    pub fn parse(
        &self,
        subject_id: &str,
        profile_url: &str,
        profile: &str,
        detail: &str,
    ) -> ExtractionRecord {
        self.parse_profile(subject_id, profile_url, profile, detail)
            .record
    }

    /// Like [`parse`](Self::parse), also returning the headshot link.
    pub fn parse_profile(
        &self,
        subject_id: &str,
        profile_url: &str,
        profile: &str,
        detail: &str,
    ) -> ParsedProfile {
        let dates = DateRangeParser::new(self.sink.as_ref(), subject_id);

        let profile_doc = Html::parse_document(profile);
        let root = profile_doc.root_element();

        let name = identity::name(root);
        if name.is_none() {
            self.sink.emit(HarvestEvent::FieldMissing {
                subject: subject_id.to_string(),
                field: "name".into(),
            });
        }
        let location = identity::location(root);
        let (city, state, country) = identity::split_location(location.as_deref());
        let headshot_link = identity::headshot_link(root);

        let mut record = ExtractionRecord {
            subject_id: subject_id.to_string(),
            profile_url: profile_url.to_string(),
            name,
            headline: identity::headline(root),
            location,
            city,
            state,
            country,
            educations: education::educations(root, &dates),
            experiences: Vec::new(),
            image_url: None,
        };

        let detail_doc = Html::parse_document(detail);
        record.experiences =
            experience::experiences(detail_doc.root_element(), &self.base_url, &dates);

        ParsedProfile {
            record,
            headshot_link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;

    #[test]
    fn test_landmark_free_documents_give_blank_record() {
        let sink = Arc::new(MemorySink::new());
        let extractor = FieldExtractor::new(sink.clone(), "https://www.linkedin.com");
        let record = extractor.parse("5", "https://x.test/in/5", "<html></html>", "");

        assert!(record.is_blank());
        assert_eq!(record.subject_id, "5");
        assert!(record.educations.is_empty());
        assert!(record.experiences.is_empty());
        assert_eq!(
            sink.events(),
            vec![HarvestEvent::FieldMissing {
                subject: "5".into(),
                field: "name".into()
            }]
        );
    }
}
