//! Chunked profile crawl across rotating accounts.
//!
//! The roster is cut into randomly sized chunks. Each chunk logs in as a
//! randomly chosen account and reuses that session for every subject in
//! it. Per subject the profile page and its experience detail page are
//! captured and persisted; one subject's failure never ends the batch.

use crate::acquisition::{RateGovernor, Session, SessionAuthenticator};
use crate::config::{CrawlConfig, SiteConfig};
use crate::crawl::store::CaptureStore;
use crate::error::{HarvestError, HarvestResult};
use crate::events::{EventSink, HarvestEvent};
use crate::model::{Account, Subject};
use crate::stealth::behavior::{pause, DelayModel};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Counts for one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub captured: usize,
    pub not_found: usize,
    pub abandoned: usize,
    /// Already captured before this run.
    pub skipped: usize,
    /// Subjects to re-queue by hand.
    pub abandoned_ids: Vec<String>,
}

/// What happened to one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitOutcome {
    Captured,
    NotFound,
    Abandoned(String),
}

/// Drives the whole profile crawl.
pub struct CrawlOrchestrator {
    authenticator: Arc<SessionAuthenticator>,
    governor: Arc<RateGovernor>,
    store: CaptureStore,
    delays: Arc<dyn DelayModel>,
    sink: Arc<dyn EventSink>,
    site: SiteConfig,
    crawl: CrawlConfig,
}

impl CrawlOrchestrator {
    pub fn new(
        authenticator: Arc<SessionAuthenticator>,
        governor: Arc<RateGovernor>,
        store: CaptureStore,
        delays: Arc<dyn DelayModel>,
        sink: Arc<dyn EventSink>,
        site: SiteConfig,
        crawl: CrawlConfig,
    ) -> Self {
        Self {
            authenticator,
            governor,
            store,
            delays,
            sink,
            site,
            crawl,
        }
    }

    /// Visit every subject not yet captured.
    ///
    /// Only an authentication failure aborts the run.
    pub async fn visit_all(
        &self,
        subjects: Vec<Subject>,
        accounts: &[Account],
    ) -> HarvestResult<CrawlSummary> {
        if accounts.is_empty() {
            return Err(HarvestError::Config("no accounts to crawl with".into()));
        }

        let mut summary = CrawlSummary::default();
        let mut pending = Vec::with_capacity(subjects.len());
        for subject in subjects {
            if self.store.is_captured(&subject.id) {
                self.sink.emit(HarvestEvent::AlreadyCaptured {
                    subject: subject.id.clone(),
                });
                summary.skipped += 1;
            } else {
                pending.push(subject);
            }
        }

        let chunks = random_chunks(
            pending,
            self.crawl.min_chunk,
            self.crawl.max_chunk,
            self.delays.as_ref(),
        );
        info!("crawling in {} chunks", chunks.len());

        for chunk in chunks {
            let account = &accounts[self.delays.uniform(0, accounts.len() - 1)];
            let mut session = self.authenticator.acquire(account).await?;

            for mut subject in chunk {
                match self.visit(&mut session, &mut subject).await {
                    VisitOutcome::Captured => summary.captured += 1,
                    VisitOutcome::NotFound => summary.not_found += 1,
                    VisitOutcome::Abandoned(_) => {
                        summary.abandoned += 1;
                        summary.abandoned_ids.push(subject.id.clone());
                    }
                }
            }

            if let Err(e) = session.close().await {
                warn!("failed to close session for account {}: {e}", account.id);
            }
        }

        info!(
            "crawl finished: {} captured, {} not found, {} abandoned, {} skipped",
            summary.captured, summary.not_found, summary.abandoned, summary.skipped
        );
        Ok(summary)
    }

    /// Capture one subject through an authenticated session.
    pub async fn visit(&self, session: &mut Session, subject: &mut Subject) -> VisitOutcome {
        let consumer = session.account().id.clone();
        let waited = self.governor.check(&consumer).await;
        if !waited.is_zero() {
            self.sink.emit(HarvestEvent::Throttled {
                consumer,
                waited_ms: waited.as_millis() as u64,
            });
        }

        match self.capture(session, subject).await {
            Ok(()) => {
                self.sink.emit(HarvestEvent::Captured {
                    subject: subject.id.clone(),
                });
                VisitOutcome::Captured
            }
            Err(HarvestError::NotFound(_)) => {
                self.sink.emit(HarvestEvent::NotFound {
                    subject: subject.id.clone(),
                });
                VisitOutcome::NotFound
            }
            Err(e) => {
                let reason = format!("{} ({e})", subject.profile_url);
                self.sink.emit(HarvestEvent::Abandoned {
                    subject: subject.id.clone(),
                    reason: reason.clone(),
                });
                VisitOutcome::Abandoned(reason)
            }
        }
    }

    async fn capture(&self, session: &mut Session, subject: &mut Subject) -> HarvestResult<()> {
        let profile = self
            .load(session, &subject.profile_url, &self.site.profile_landmark)
            .await?;
        let detail_url = subject.detail_url(&self.site.detail_suffix);
        let detail = self
            .load(session, &detail_url, &self.site.detail_landmark)
            .await?;

        self.store.persist(&subject.id, &profile, &detail)?;
        subject.attach(profile, detail);
        Ok(())
    }

    /// Navigate, settle, wait for the landmark, and snapshot the document.
    ///
    /// A landmark timeout that ends on the not-found location becomes
    /// `HarvestError::NotFound`.
    async fn load(&self, session: &mut Session, url: &str, landmark: &str) -> HarvestResult<String> {
        let browser = session.browser_mut();
        browser.navigate(url).await?;
        pause(self.delays.as_ref(), self.crawl.page_settle).await;

        match browser
            .wait_for(landmark, self.crawl.landmark_timeout())
            .await
        {
            Ok(()) => browser.raw_document().await,
            Err(timeout @ HarvestError::Timeout { .. }) => {
                let location = browser.current_location().await.unwrap_or_default();
                if location == self.site.not_found_url {
                    Err(HarvestError::NotFound(url.to_string()))
                } else {
                    Err(timeout)
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// Split `items` into consecutive chunks with sizes drawn from `min..=max`.
///
/// Order is preserved; only the last chunk may fall below `min`.
pub fn random_chunks<T>(
    items: Vec<T>,
    min: usize,
    max: usize,
    model: &dyn DelayModel,
) -> Vec<Vec<T>> {
    let min = min.max(1);
    let max = max.max(min);
    let mut chunks = Vec::new();
    let mut rest = items.into_iter().peekable();
    while rest.peek().is_some() {
        let size = model.uniform(min, max);
        chunks.push(rest.by_ref().take(size).collect());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stealth::behavior::{FixedDelay, HumanDelay};

    #[test]
    fn test_random_chunks_preserve_order_and_bounds() {
        let model = HumanDelay::seeded(11);
        let items: Vec<usize> = (0..100).collect();
        let chunks = random_chunks(items.clone(), 5, 15, &model);

        let flat: Vec<usize> = chunks.iter().flatten().copied().collect();
        assert_eq!(flat, items);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!((5..=15).contains(&chunk.len()));
        }
        assert!(chunks.last().unwrap().len() <= 15);
    }

    #[test]
    fn test_random_chunks_empty_input() {
        assert!(random_chunks(Vec::<u8>::new(), 5, 15, &FixedDelay).is_empty());
    }

    #[test]
    fn test_fixed_model_takes_min_size() {
        let chunks = random_chunks((0..12).collect::<Vec<_>>(), 5, 15, &FixedDelay);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
    }
}
