// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! `harvest extract`: captured documents to JSON records.

use crate::cli::output::{self, Styled};
use crate::crawl::CaptureStore;
use crate::extraction::{BatchExtractor, FieldExtractor, HeadshotFetcher};
use crate::roster;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

fn progress_bar(total: u64) -> ProgressBar {
    if output::is_quiet() || output::is_json() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::with_template("  {spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("\u{2588}\u{2589}\u{2591}"));
    }
    bar
}

pub async fn run(
    config_path: Option<&Path>,
    roster_path: &Path,
    id_column: &str,
    url_column: &str,
    no_images: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let subjects = roster::load_roster(roster_path, id_column, url_column)
        .with_context(|| format!("failed to read roster {}", roster_path.display()))?;
    let sink = super::event_sink(&config)?;

    let extractor = FieldExtractor::new(sink.clone(), config.site.base_url.clone());
    let store = CaptureStore::new(&config.paths.profile_dir, &config.paths.detail_dir);
    let mut batch = BatchExtractor::new(extractor, store, &config.paths.output_dir, sink.clone());
    let mut headshot_dir = None;

    if config.extract.fetch_images && !no_images {
        let fetcher = HeadshotFetcher::new(
            &config.paths.headshot_dir,
            config.extract.fetch_timeout_ms,
            super::delay_model(None),
            config.extract.after_fetch,
            sink,
        );
        headshot_dir = Some(fetcher.dir().display().to_string());
        batch = batch.with_headshots(fetcher, config.extract.fetch_concurrency);
    }

    let bar = progress_bar(subjects.len() as u64);
    let ticker = bar.clone();
    batch = batch.with_progress(Arc::new(move |id: &str| {
        ticker.set_message(id.to_string());
        ticker.inc(1);
    }));

    let summary = batch.run(&subjects).await.context("extraction failed")?;
    bar.finish_and_clear();

    if output::is_json() {
        output::print_json(&serde_json::to_value(&summary)?);
    } else if !output::is_quiet() {
        let s = Styled::new();
        output::print_check(
            s.ok_sym(),
            "Extracted:",
            &format!("{} of {}", summary.extracted, subjects.len()),
        );
        output::print_check(s.info_sym(), "No capture:", &summary.missing.to_string());
        let headshots = match &headshot_dir {
            Some(dir) => format!("{} in {dir}", summary.images_saved),
            None => "skipped".to_string(),
        };
        output::print_check(s.info_sym(), "Headshots:", &headshots);
        if summary.write_failures > 0 {
            output::print_check(
                s.warn_sym(),
                "Write errors:",
                &summary.write_failures.to_string(),
            );
        }
        output::print_check(
            s.info_sym(),
            "Records in:",
            &config.paths.output_dir.display().to_string(),
        );
    }
    Ok(())
}
