//! Acquisition drivers: the chunked profile crawl and the paginated
//! membership search, plus raw capture storage.

pub mod orchestrator;
pub mod search;
pub mod store;

pub use orchestrator::{CrawlOrchestrator, CrawlSummary, VisitOutcome};
pub use search::PaginatedSearchCrawler;
pub use store::CaptureStore;
