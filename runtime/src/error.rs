//! Typed failure classes for acquisition and extraction.
//!
//! Per-subject failures (`NotFound`, `Timeout`, `Browser`) are contained by
//! the orchestrator; `Auth` and `Config` abort a run. Markup mismatches are
//! never errors: the extractor represents them as absent fields.

/// Errors that can occur in the harvest runtime.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("authentication failed for account {account}: {reason}")]
    Auth { account: String, reason: String },

    #[error("page not found: {0}")]
    NotFound(String),

    #[error("timed out after {waited_ms}ms waiting for `{selector}`")]
    Timeout { selector: String, waited_ms: u64 },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HarvestError {
    /// Whether this failure is contained at the subject boundary.
    pub fn is_per_subject(&self) -> bool {
        matches!(
            self,
            HarvestError::NotFound(_) | HarvestError::Timeout { .. } | HarvestError::Browser(_)
        )
    }
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
