// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! `harvest search`: company membership via the paginated people search.

use crate::acquisition::{RateGovernor, SessionAuthenticator};
use crate::cli::output::{self, Styled};
use crate::crawl::PaginatedSearchCrawler;
use crate::model::MembershipRecord;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::roster;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(
    config_path: Option<&Path>,
    companies: &[String],
    accounts_path: &Path,
    account_id: Option<&str>,
    output_path: &Path,
    resolve: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let accounts = roster::load_accounts(accounts_path)
        .with_context(|| format!("failed to read accounts {}", accounts_path.display()))?;
    let account = match account_id {
        Some(id) => accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow!("no account with id {id} in {}", accounts_path.display()))?,
        None => &accounts[0],
    };
    let cookies = super::trust_cookies(&config)?;
    let sink = super::event_sink(&config)?;
    let delays = super::delay_model(None);

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
    let authenticator = SessionAuthenticator::new(
        renderer.clone(),
        delays.clone(),
        sink.clone(),
        config.site.clone(),
        config.login.clone(),
    )
    .with_cookies(cookies);
    let session = authenticator
        .acquire(account)
        .await
        .context("login failed")?;

    let mut crawler = PaginatedSearchCrawler::new(
        session,
        governor,
        delays,
        sink,
        config.site.clone(),
        config.search.clone(),
        config.login.keystroke,
    );
    let collected = collect_all(&mut crawler, companies, resolve).await;
    crawler.into_session().close().await.ok();
    renderer.shutdown().await.ok();
    let records = collected?;

    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(output_path, json)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!("wrote {} records to {}", records.len(), output_path.display());

    if output::is_json() {
        output::print_json(&serde_json::to_value(&records)?);
    } else if !output::is_quiet() {
        let s = Styled::new();
        let members = records.iter().filter(|r| !r.is_sentinel()).count();
        output::print_check(
            s.ok_sym(),
            "Members:",
            &format!("{members} across {} companies", companies.len()),
        );
        output::print_check(s.info_sym(), "Written to:", &output_path.display().to_string());
    }
    Ok(())
}

async fn collect_all(
    crawler: &mut PaginatedSearchCrawler,
    companies: &[String],
    resolve: bool,
) -> Result<Vec<MembershipRecord>> {
    crawler
        .initialize()
        .await
        .context("search page never became ready")?;

    let mut records = Vec::new();
    for company in companies {
        match crawler.visit_company(company).await {
            Ok(found) => records.extend(found),
            Err(e) if e.is_per_subject() => warn!("search for {company} broke off: {e}"),
            Err(e) => return Err(e).with_context(|| format!("search for {company} failed")),
        }
    }

    if resolve {
        for record in records.iter_mut().filter(|r| !r.is_sentinel()) {
            let Some(lead) = record.lead_url.clone() else {
                continue;
            };
            match crawler.resolve_profile_url(&lead).await {
                Ok(Some(profile)) => record.profile_url = Some(profile),
                Ok(None) => warn!("no public profile behind lead {lead}"),
                Err(e) => warn!("failed to resolve lead {lead}: {e}"),
            }
        }
    }
    Ok(records)
}
