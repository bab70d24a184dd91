//! Batch extraction over a capture store.
//!
//! Pairs are loaded up front, parsed one subject per rayon worker, then
//! headshots (if enabled) are fetched through a bounded concurrent stream
//! before each record is written as `{output_dir}/{id}.json`.

use crate::crawl::store::CaptureStore;
use crate::error::{HarvestError, HarvestResult};
use crate::events::{EventSink, HarvestEvent};
use crate::extraction::headshot::HeadshotFetcher;
use crate::extraction::{FieldExtractor, ParsedProfile};
use crate::model::{ExtractionRecord, Subject};
use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Called with each subject id as its record lands on disk.
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Counts from one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub extracted: usize,
    /// Subjects with no complete capture pair.
    pub missing: usize,
    pub images_saved: usize,
    pub write_failures: usize,
}

pub struct BatchExtractor {
    extractor: Arc<FieldExtractor>,
    store: CaptureStore,
    output_dir: PathBuf,
    fetcher: Option<HeadshotFetcher>,
    fetch_concurrency: usize,
    sink: Arc<dyn EventSink>,
    progress: Option<ProgressFn>,
}

impl BatchExtractor {
    pub fn new(
        extractor: FieldExtractor,
        store: CaptureStore,
        output_dir: impl Into<PathBuf>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            store,
            output_dir: output_dir.into(),
            fetcher: None,
            fetch_concurrency: 1,
            sink,
            progress: None,
        }
    }

    /// Download headshots with at most `concurrency` requests in flight.
    pub fn with_headshots(mut self, fetcher: HeadshotFetcher, concurrency: usize) -> Self {
        self.fetcher = Some(fetcher);
        self.fetch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn run(&self, subjects: &[Subject]) -> HarvestResult<BatchSummary> {
        let mut summary = BatchSummary::default();

        let mut pairs = Vec::with_capacity(subjects.len());
        for subject in subjects {
            match self.store.load(&subject.id) {
                Ok(Some((profile, detail))) => {
                    pairs.push((subject.id.clone(), subject.profile_url.clone(), profile, detail))
                }
                Ok(None) => {
                    debug!("no capture pair for subject {}", subject.id);
                    summary.missing += 1;
                }
                Err(e) => {
                    warn!("unreadable capture for subject {}: {e}", subject.id);
                    summary.missing += 1;
                }
            }
        }

        let extractor = Arc::clone(&self.extractor);
        let parsed: Vec<ParsedProfile> = tokio::task::spawn_blocking(move || {
            pairs
                .into_par_iter()
                .map(|(id, url, profile, detail)| {
                    extractor.parse_profile(&id, &url, &profile, &detail)
                })
                .collect()
        })
        .await
        .map_err(|e| HarvestError::Io(std::io::Error::other(e)))?;

        let records: Vec<ExtractionRecord> = match &self.fetcher {
            Some(fetcher) => {
                stream::iter(parsed)
                    .map(|p| async move {
                        let mut record = p.record;
                        if let Some(link) = p.headshot_link {
                            record.image_url = fetcher.fetch(&record.subject_id, &link).await;
                        } else {
                            debug!("no headshot link for subject {}", record.subject_id);
                        }
                        record
                    })
                    .buffer_unordered(self.fetch_concurrency)
                    .collect()
                    .await
            }
            None => parsed.into_iter().map(|p| p.record).collect(),
        };

        std::fs::create_dir_all(&self.output_dir)?;
        for record in &records {
            if record.image_url.is_some() {
                summary.images_saved += 1;
            }
            match write_record(&self.output_dir, record) {
                Ok(_) => {
                    summary.extracted += 1;
                    self.sink.emit(HarvestEvent::Extracted {
                        subject: record.subject_id.clone(),
                    });
                    if let Some(progress) = &self.progress {
                        progress(&record.subject_id);
                    }
                }
                Err(e) => {
                    warn!("failed to write record {}: {e}", record.subject_id);
                    summary.write_failures += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Write one record as pretty JSON with sorted keys and four-space indent.
pub fn write_record(dir: &Path, record: &ExtractionRecord) -> HarvestResult<PathBuf> {
    let value = sort_keys(serde_json::to_value(record)?);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');

    let path = dir.join(format!("{}.json", record.subject_id));
    std::fs::write(&path, buf)?;
    Ok(path)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;

    fn extractor(sink: Arc<MemorySink>) -> FieldExtractor {
        FieldExtractor::new(sink, "https://www.linkedin.com")
    }

    #[tokio::test]
    async fn test_missing_pairs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path().join("p"), dir.path().join("d"));
        store.persist("1", "<html></html>", "<html></html>").unwrap();
        let out = dir.path().join("out");
        let sink = Arc::new(MemorySink::new());

        let subjects = vec![
            Subject::new("1", "https://x.test/in/1"),
            Subject::new("2", "https://x.test/in/2"),
        ];
        let summary = BatchExtractor::new(extractor(sink.clone()), store, &out, sink.clone())
            .run(&subjects)
            .await
            .unwrap();

        assert_eq!(summary.extracted, 1);
        assert_eq!(summary.missing, 1);
        assert!(out.join("1.json").exists());
        assert!(!out.join("2.json").exists());
    }

    #[test]
    fn test_written_keys_are_sorted_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        let record = ExtractionRecord {
            subject_id: "9".into(),
            profile_url: "https://x.test/in/9".into(),
            name: Some("Ada".into()),
            headline: None,
            location: None,
            city: None,
            state: None,
            country: None,
            educations: Vec::new(),
            experiences: Vec::new(),
            image_url: None,
        };
        let path = write_record(dir.path(), &record).unwrap();
        let text = std::fs::read_to_string(path).unwrap();

        let city = text.find("\"city\"").unwrap();
        let name = text.find("\"name\"").unwrap();
        let subject = text.find("\"subject_id\"").unwrap();
        assert!(city < name && name < subject);
        assert!(text.contains("\n    \"city\": null"));
    }
}
