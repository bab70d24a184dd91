//! CLI subcommand implementations for the Harvest binary.

pub mod crawl_cmd;
pub mod doctor;
pub mod extract_cmd;
pub mod output;
pub mod search_cmd;

use crate::audit::AuditLogger;
use crate::config::HarvestConfig;
use crate::events::{EventSink, Tee, TracingSink};
use crate::renderer::TrustCookie;
use crate::roster;
use crate::stealth::behavior::{DelayModel, HumanDelay};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Resolve and validate the runtime config.
pub fn load_config(explicit: Option<&Path>) -> Result<HarvestConfig> {
    HarvestConfig::resolve(explicit).context("failed to load configuration")
}

/// Events go to `tracing` and to the append-only audit log.
pub fn event_sink(config: &HarvestConfig) -> Result<Arc<dyn EventSink>> {
    let audit = AuditLogger::open(&config.paths.audit_log).with_context(|| {
        format!(
            "failed to open audit log {}",
            config.paths.audit_log.display()
        )
    })?;
    tracing::info!("audit run {}", audit.run_id());
    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(TracingSink), Arc::new(audit)];
    Ok(Arc::new(Tee::new(sinks)))
}

pub fn delay_model(seed: Option<u64>) -> Arc<dyn DelayModel> {
    match seed {
        Some(seed) => Arc::new(HumanDelay::seeded(seed)),
        None => Arc::new(HumanDelay::new()),
    }
}

/// Trust cookies named by `site.cookie_file`, if any.
pub fn trust_cookies(config: &HarvestConfig) -> Result<Vec<TrustCookie>> {
    match &config.site.cookie_file {
        Some(path) => roster::load_trust_cookies(path)
            .with_context(|| format!("failed to load cookies from {}", path.display())),
        None => Ok(Vec::new()),
    }
}
