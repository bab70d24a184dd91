//! Headshot download.
//!
//! Only http(s) links are fetched; anything else (placeholder data URIs,
//! relative paths) counts as a blank picture. The image bytes are written
//! to `{dir}/{subject}.png` and the link is returned on success.

use crate::error::HarvestResult;
use crate::events::{EventSink, HarvestEvent};
use crate::stealth::behavior::{pause, DelayModel, DelayRange};
use crate::stealth::fingerprint::DESKTOP_USER_AGENT;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Fetches headshot images over HTTP.
#[derive(Clone)]
pub struct HeadshotFetcher {
    client: reqwest::Client,
    dir: PathBuf,
    delays: Arc<dyn DelayModel>,
    after_fetch: DelayRange,
    sink: Arc<dyn EventSink>,
}

impl HeadshotFetcher {
    pub fn new(
        dir: impl Into<PathBuf>,
        timeout_ms: u64,
        delays: Arc<dyn DelayModel>,
        after_fetch: DelayRange,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(DESKTOP_USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            dir: dir.into(),
            delays,
            after_fetch,
            sink,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download `link` for `subject`. Returns the link if the image was saved.
    pub async fn fetch(&self, subject: &str, link: &str) -> Option<String> {
        if !(link.starts_with("http://") || link.starts_with("https://")) {
            self.sink.emit(HarvestEvent::BlankImage {
                subject: subject.to_string(),
            });
            return None;
        }

        let saved = match self.download(subject, link).await {
            Ok(()) => Some(link.to_string()),
            Err(e) => {
                self.sink.emit(HarvestEvent::ImageFailed {
                    subject: subject.to_string(),
                    reason: e.to_string(),
                });
                None
            }
        };
        pause(self.delays.as_ref(), self.after_fetch).await;
        saved
    }

    async fn download(&self, subject: &str, link: &str) -> HarvestResult<()> {
        let resp = self.client.get(link).send().await?.error_for_status()?;
        let bytes = resp.bytes().await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(format!("{subject}.png")), &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::stealth::behavior::FixedDelay;

    #[tokio::test]
    async fn test_non_http_link_is_blank() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let fetcher = HeadshotFetcher::new(
            dir.path(),
            1_000,
            Arc::new(FixedDelay),
            DelayRange::new(0, 0),
            sink.clone(),
        );

        let saved = fetcher
            .fetch("3", "data:image/gif;base64,R0lGODlhAQABAAAAACw=")
            .await;
        assert_eq!(saved, None);
        assert_eq!(
            sink.events(),
            vec![HarvestEvent::BlankImage {
                subject: "3".into()
            }]
        );
        assert!(!dir.path().join("3.png").exists());
    }
}
