// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! `harvest crawl`: capture profile and detail documents for a roster.

use crate::acquisition::{RateGovernor, SessionAuthenticator};
use crate::cli::output::{self, Styled};
use crate::crawl::{CaptureStore, CrawlOrchestrator};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::roster;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    roster_path: &Path,
    accounts_path: &Path,
    id_column: &str,
    url_column: &str,
    seed: Option<u64>,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let subjects = roster::load_roster(roster_path, id_column, url_column)
        .with_context(|| format!("failed to read roster {}", roster_path.display()))?;
    let accounts = roster::load_accounts(accounts_path)
        .with_context(|| format!("failed to read accounts {}", accounts_path.display()))?;
    let cookies = super::trust_cookies(&config)?;
    let sink = super::event_sink(&config)?;
    let delays = super::delay_model(seed);

    let governor = Arc::new(
        RateGovernor::new(config.governor.limit, config.governor.period())
            .context("invalid governor settings")?,
    );
    info!(
        "rate governor allows {} page loads per {}s",
        governor.limit(),
        governor.period().as_secs()
    );
    let renderer = Arc::new(
        ChromiumRenderer::launch(
            config.browser.chromium_path.as_ref(),
            config.browser.headless,
        )
        .await
        .context("failed to start Chromium")?,
    );
    let authenticator = Arc::new(
        SessionAuthenticator::new(
            renderer.clone(),
            delays.clone(),
            sink.clone(),
            config.site.clone(),
            config.login.clone(),
        )
        .with_cookies(cookies),
    );
    let store = CaptureStore::new(&config.paths.profile_dir, &config.paths.detail_dir);
    let orchestrator = CrawlOrchestrator::new(
        authenticator,
        governor,
        store,
        delays,
        sink,
        config.site.clone(),
        config.crawl.clone(),
    );

    let started = Instant::now();
    let total = subjects.len();
    let result = orchestrator.visit_all(subjects, &accounts).await;
    renderer.shutdown().await.ok();
    let summary = result.context("crawl aborted")?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&summary)?);
        return Ok(());
    }
    if !output::is_quiet() {
        let s = Styled::new();
        output::print_header(&s);
        output::print_check(s.ok_sym(), "Captured:", &format!("{} of {total}", summary.captured));
        output::print_check(s.info_sym(), "Skipped:", &summary.skipped.to_string());
        output::print_check(s.info_sym(), "Not found:", &summary.not_found.to_string());
        if summary.abandoned > 0 {
            output::print_check(s.warn_sym(), "Abandoned:", &summary.abandoned.to_string());
            output::print_detail(&format!("re-queue: {}", summary.abandoned_ids.join(", ")));
        }
        output::print_check(
            s.info_sym(),
            "Elapsed:",
            &output::format_duration(started.elapsed().as_secs()),
        );
    }
    Ok(())
}
