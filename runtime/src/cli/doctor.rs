// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.
//!
//! Verifies the config resolves, Chromium is present and launches headless,
//! and the capture/output directories are writable. Every failure includes
//! a specific fix instruction.

use crate::cli::output::{self, Styled};
use crate::config::HarvestConfig;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run the doctor diagnostic.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = HarvestConfig::resolve(config_path);
    let chromium = find_chromium(
        config
            .as_ref()
            .ok()
            .and_then(|c| c.browser.chromium_path.as_ref()),
    );

    if output::is_json() {
        let dirs = config.as_ref().map(checked_dirs).unwrap_or_default();
        let json = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "config_ok": config.is_ok(),
            "config_error": config.as_ref().err().map(|e| e.to_string()),
            "chromium_path": chromium.as_ref().map(|p| p.display().to_string()),
            "chromium_version": chromium.as_ref().and_then(|p| chromium_version(p)),
            "writable_dirs": dirs
                .iter()
                .map(|(label, path, ok)| serde_json::json!({
                    "name": label, "path": path.display().to_string(), "writable": ok
                }))
                .collect::<Vec<_>>(),
        });
        output::print_json(&json);
        return Ok(());
    }

    let s = Styled::new();
    let mut ready = true;
    output::print_header(&s);

    output::print_section(&s, "Config");
    match &config {
        Ok(c) => {
            output::print_check(s.ok_sym(), "Config:", "valid");
            output::print_check(
                s.info_sym(),
                "Governor:",
                &format!(
                    "{} loads per {}",
                    c.governor.limit,
                    output::format_duration(c.governor.period_secs)
                ),
            );
        }
        Err(e) => {
            output::print_check(s.fail_sym(), "Config:", &e.to_string());
            output::print_detail("Fix: pass --config or set HARVEST_CONFIG to a valid file");
            ready = false;
        }
    }
    eprintln!();

    output::print_section(&s, "Browser");
    match &chromium {
        Some(path) => {
            let version = chromium_version(path);
            output::print_check(
                s.ok_sym(),
                "Chromium:",
                &format!(
                    "{} at {}",
                    version.as_deref().unwrap_or("unknown version"),
                    path.display()
                ),
            );
            match headless_launch(path) {
                Ok(ms) => output::print_check(
                    s.ok_sym(),
                    "Headless test:",
                    &format!("launched and closed in {ms}ms"),
                ),
                Err(msg) => {
                    output::print_check(s.fail_sym(), "Headless test:", &format!("FAILED: {msg}"));
                    if msg.contains("shared librar") || msg.contains("libnss") {
                        output::print_detail(
                            "Fix (Ubuntu/Debian): sudo apt install libnss3 libatk1.0-0 libatk-bridge2.0-0",
                        );
                    }
                    ready = false;
                }
            }
        }
        None => {
            output::print_check(s.fail_sym(), "Chromium:", "NOT FOUND");
            output::print_detail("Fix: set HARVEST_CHROMIUM_PATH=/path/to/chrome");
            output::print_detail("Or set browser.chromium_path in the config");
            ready = false;
        }
    }
    eprintln!();

    if let Ok(c) = &config {
        output::print_section(&s, "Storage");
        for (label, path, ok) in checked_dirs(c) {
            if ok {
                output::print_check(s.ok_sym(), label, &path.display().to_string());
            } else {
                output::print_check(
                    s.fail_sym(),
                    label,
                    &format!("{} is not writable", path.display()),
                );
                ready = false;
            }
        }
    }

    if ready {
        output::print_status(&s, &s.green("READY"), "start with 'harvest crawl'");
    } else {
        output::print_status(&s, &s.red("NOT READY"), "fix issues above");
    }
    Ok(())
}

fn checked_dirs(config: &HarvestConfig) -> Vec<(&'static str, PathBuf, bool)> {
    let audit_dir = config
        .paths
        .audit_log
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    [
        ("Profiles:", config.paths.profile_dir.clone()),
        ("Details:", config.paths.detail_dir.clone()),
        ("Records:", config.paths.output_dir.clone()),
        ("Headshots:", config.paths.headshot_dir.clone()),
        ("Audit log:", audit_dir),
    ]
    .into_iter()
    .map(|(label, path)| {
        let ok = is_writable(&path);
        (label, path, ok)
    })
    .collect()
}

/// Creates the directory if needed and probes it with a scratch file.
fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".harvest-doctor");
    let ok = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}

fn chromium_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if output.status.success() {
        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Some(raw.replace("Google Chrome ", "").replace("Chromium ", ""))
    } else {
        None
    }
}

fn headless_launch(path: &Path) -> Result<u64, String> {
    let start = std::time::Instant::now();
    let output = Command::new(path)
        .args(["--headless", "--disable-gpu", "--dump-dom", "about:blank"])
        .output()
        .map_err(|e| format!("failed to launch: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(stderr.lines().next().unwrap_or("unknown error").to_string());
    }
    Ok(start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_writable_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        assert!(is_writable(&nested));
        assert!(nested.exists());
        assert!(!nested.join(".harvest-doctor").exists());
    }
}
