use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::poll::PollConfig;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "em2m.yaml";

/// Application configuration
///
/// Loaded from an optional YAML file, then overridden by environment
/// variables so CI can inject credentials without touching files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Application root, e.g. `https://elasticm2m-dev.app.em2m.net`
    pub base_url: String,

    pub username: String,

    pub password: String,

    /// chromium, firefox or webkit
    pub browser: String,

    pub headless: bool,

    /// "width,height"
    pub window_size: String,

    /// Default timeout for element waiting (ms)
    pub default_timeout_ms: u64,

    /// Timeout for page navigation and readiness (ms)
    pub page_load_timeout_ms: u64,

    /// Delay between two poll attempts (ms)
    pub poll_interval_ms: u64,

    /// Where scenario result records are written and read
    pub results_dir: PathBuf,

    /// Where reports and failure screenshots go
    pub report_dir: PathBuf,

    pub report: ReportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSettings {
    /// Steps listed per scenario before truncating
    pub max_steps: usize,
    pub title: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            max_steps: 5,
            title: "EM2M Test Automation Report".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://elasticm2m-dev.app.em2m.net".to_string(),
            username: "testuser@em2m.net".to_string(),
            password: "TestPassword123".to_string(),
            browser: "chromium".to_string(),
            headless: false,
            window_size: "1920,1080".to_string(),
            default_timeout_ms: 10_000,
            page_load_timeout_ms: 30_000,
            poll_interval_ms: 250,
            results_dir: PathBuf::from("allure-results"),
            report_dir: PathBuf::from("reports"),
            report: ReportSettings::default(),
        }
    }
}

impl Config {
    /// Load `path`, or `em2m.yaml` if present, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from a variable lookup; invalid values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("TEST_USERNAME") {
            self.username = v;
        }
        if let Some(v) = lookup("TEST_PASSWORD") {
            self.password = v;
        }
        if let Some(v) = lookup("BROWSER") {
            self.browser = v;
        }
        if let Some(v) = lookup("HEADLESS") {
            match parse_bool(&v) {
                Some(b) => self.headless = b,
                None => log::warn!("Ignoring invalid HEADLESS value '{}'", v),
            }
        }
        if let Some(v) = lookup("WINDOW_SIZE") {
            if parse_window_size(&v).is_some() {
                self.window_size = v;
            } else {
                log::warn!("Ignoring invalid WINDOW_SIZE value '{}'", v);
            }
        }
        if let Some(secs) = parse_number(&lookup, "DEFAULT_TIMEOUT") {
            self.default_timeout_ms = secs * 1000;
        }
        if let Some(secs) = parse_number(&lookup, "PAGE_LOAD_TIMEOUT") {
            self.page_load_timeout_ms = secs * 1000;
        }
        if let Some(ms) = parse_number(&lookup, "POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms;
        }
        if let Some(v) = lookup("RESULTS_DIR") {
            self.results_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("REPORT_DIR") {
            self.report_dir = PathBuf::from(v);
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url.trim_end_matches('/'))
    }

    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.base_url.trim_end_matches('/'))
    }

    /// Viewport from `windowSize`, falling back to 1920x1080
    pub fn window_dimensions(&self) -> (u32, u32) {
        parse_window_size(&self.window_size).unwrap_or((1920, 1080))
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(self.default_timeout())
            .with_interval(Duration::from_millis(self.poll_interval_ms))
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.report_dir.join("screenshots")
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_number<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("Ignoring invalid {} value '{}'", key, raw);
            None
        }
    }
}

fn parse_window_size(v: &str) -> Option<(u32, u32)> {
    let (w, h) = v.split_once(',')?;
    let w = w.trim().parse().ok()?;
    let h = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}
