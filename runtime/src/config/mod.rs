//! Configuration loading and resolution.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Resolution order: explicit path, `HARVEST_CONFIG`, `./harvest.json`,
//! `~/.harvest/config.json`, then built-in defaults.

use crate::error::{HarvestError, HarvestResult};
use crate::stealth::behavior::DelayRange;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Target site locations and the landmarks that prove a page rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub login_url: String,
    /// The one location that proves a login succeeded.
    pub landing_url: String,
    /// Location the site redirects to for missing profiles.
    pub not_found_url: String,
    pub search_url: String,
    pub username_field: String,
    pub password_field: String,
    pub submit_button: String,
    pub profile_landmark: String,
    pub detail_landmark: String,
    pub detail_suffix: String,
    /// JSON file of trust cookies loaded before logging in.
    pub cookie_file: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com".into(),
            login_url: "https://www.linkedin.com/".into(),
            landing_url: "https://www.linkedin.com/feed/?trk=homepage-basic_signin-form_submit"
                .into(),
            not_found_url: "https://www.linkedin.com/404/".into(),
            search_url: "https://www.linkedin.com/sales/search/people".into(),
            username_field: "#session_key".into(),
            password_field: "#session_password".into(),
            submit_button: "[type=\"submit\"]".into(),
            profile_landmark: "#experience".into(),
            detail_landmark: "#profile-content".into(),
            detail_suffix: "/details/experience/".into(),
            cookie_file: None,
        }
    }
}

/// Login mimicry and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub max_tries: u32,
    pub form_timeout_ms: u64,
    pub keystroke: DelayRange,
    pub junk_min: usize,
    pub junk_max: usize,
    pub after_cookies: DelayRange,
    pub after_username: DelayRange,
    pub after_password: DelayRange,
    pub before_submit: DelayRange,
    pub after_submit: DelayRange,
    pub retry_cooldown: DelayRange,
    pub after_login: DelayRange,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_tries: 3,
            form_timeout_ms: 40_000,
            keystroke: DelayRange::new(100, 900),
            junk_min: 3,
            junk_max: 7,
            after_cookies: DelayRange::new(50, 100),
            after_username: DelayRange::new(600, 1_000),
            after_password: DelayRange::new(1_400, 2_200),
            before_submit: DelayRange::new(100, 200),
            after_submit: DelayRange::new(1_500, 2_000),
            retry_cooldown: DelayRange::new(30_000, 40_000),
            after_login: DelayRange::new(2_000, 3_000),
        }
    }
}

/// Rolling-window budget for chargeable page loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub limit: usize,
    pub period_secs: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            limit: 45,
            period_secs: 3_600,
        }
    }
}

impl GovernorConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// Profile crawl pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub landmark_timeout_ms: u64,
    pub page_settle: DelayRange,
    pub min_chunk: usize,
    pub max_chunk: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            landmark_timeout_ms: 30_000,
            page_settle: DelayRange::new(9_000, 11_000),
            min_chunk: 5,
            max_chunk: 15,
        }
    }
}

impl CrawlConfig {
    pub fn landmark_timeout(&self) -> Duration {
        Duration::from_millis(self.landmark_timeout_ms)
    }
}

/// Paginated people-search pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Reverse-scroll after forcing rows to render.
    pub safe_mode: bool,
    pub max_pages: usize,
    pub landmark_timeout_ms: u64,
    pub row_scroll: DelayRange,
    pub page_settle: DelayRange,
    pub filter_settle: DelayRange,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            safe_mode: true,
            max_pages: 100,
            landmark_timeout_ms: 30_000,
            row_scroll: DelayRange::new(100, 150),
            page_settle: DelayRange::new(500, 600),
            filter_settle: DelayRange::new(300, 600),
        }
    }
}

impl SearchConfig {
    pub fn landmark_timeout(&self) -> Duration {
        Duration::from_millis(self.landmark_timeout_ms)
    }
}

/// Where captures and outputs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub profile_dir: PathBuf,
    pub detail_dir: PathBuf,
    pub output_dir: PathBuf,
    pub headshot_dir: PathBuf,
    pub audit_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = harvest_home();
        Self {
            profile_dir: root.join("captures/profile"),
            detail_dir: root.join("captures/detail"),
            output_dir: root.join("records"),
            headshot_dir: root.join("headshots"),
            audit_log: root.join("audit.jsonl"),
        }
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
        }
    }
}

/// Headshot download settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub fetch_images: bool,
    pub fetch_concurrency: usize,
    pub fetch_timeout_ms: u64,
    pub after_fetch: DelayRange,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            fetch_images: true,
            fetch_concurrency: 4,
            fetch_timeout_ms: 15_000,
            after_fetch: DelayRange::new(50, 100),
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub site: SiteConfig,
    pub login: LoginConfig,
    pub governor: GovernorConfig,
    pub crawl: CrawlConfig,
    pub search: SearchConfig,
    pub paths: PathsConfig,
    pub browser: BrowserSettings,
    pub extract: ExtractConfig,
}

impl HarvestConfig {
    /// Read and validate a config file.
    pub fn from_file(path: &Path) -> HarvestResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: HarvestConfig = serde_json::from_str(&raw)
            .map_err(|e| HarvestError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config from the standard locations.
    pub fn resolve(explicit: Option<&Path>) -> HarvestResult<Self> {
        match resolve_config_path(explicit) {
            Some(path) => {
                info!("loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> HarvestResult<()> {
        if self.governor.limit == 0 {
            return Err(HarvestError::Config("governor.limit must be at least 1".into()));
        }
        if self.governor.period_secs == 0 {
            return Err(HarvestError::Config(
                "governor.period_secs must be at least 1".into(),
            ));
        }
        if self.login.max_tries == 0 {
            return Err(HarvestError::Config("login.max_tries must be at least 1".into()));
        }
        if self.crawl.min_chunk == 0 || self.crawl.min_chunk > self.crawl.max_chunk {
            return Err(HarvestError::Config(format!(
                "crawl chunk bounds {}..={} are invalid",
                self.crawl.min_chunk, self.crawl.max_chunk
            )));
        }
        if self.login.junk_min > self.login.junk_max {
            return Err(HarvestError::Config("login.junk_min exceeds junk_max".into()));
        }
        Ok(())
    }
}

/// Root directory for runtime state (`~/.harvest`).
pub fn harvest_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".harvest")
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("HARVEST_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from("harvest.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = harvest_home().join("config.json");
    home_config.exists().then_some(home_config)
}
