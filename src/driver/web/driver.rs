//! Browser session backed by Playwright
//!
//! Element queries run as one script per call so that every locator kind
//! resolves the same way in every engine. Clicks and fills go through
//! Playwright's own actions to get real input events.

use anyhow::{Context, Result};
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::driver::traits::{BrowserSession, Locator, SessionLauncher};
use crate::utils::config::Config;

/// Web browser type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }
}

impl FromStr for BrowserType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserType::Chromium),
            "firefox" => Ok(BrowserType::Firefox),
            "webkit" | "safari" => Ok(BrowserType::Webkit),
            other => anyhow::bail!(
                "Unsupported browser '{}' (expected chromium, firefox or webkit)",
                other
            ),
        }
    }
}

/// Web Driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            browser_type: BrowserType::Chromium,
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

impl WebDriverConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        let (viewport_width, viewport_height) = config.window_dimensions();
        Ok(Self {
            browser_type: config.browser.parse()?,
            headless: config.headless,
            viewport_width,
            viewport_height,
        })
    }
}

/// Web Driver using Playwright
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
}

impl WebDriver {
    /// Launch a browser and open a single page
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match config.browser_type {
            BrowserType::Chromium => launch_chromium_browser(&playwright.chromium(), &config).await?,
            BrowserType::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserType::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        log::info!(
            "Launched {} (headless: {}, viewport {}x{})",
            config.browser_type.as_str(),
            config.headless,
            config.viewport_width,
            config.viewport_height
        );

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
        })
    }

    /// Evaluate one of the element scripts with the locator bound as `args.locator`
    async fn query<R: DeserializeOwned>(&self, body: &str, locator: &Locator, extra: Value) -> Result<R> {
        let args = json!({ "locator": locator, "extra": extra });
        let page = self.page.lock().await;
        let result = page
            .evaluate::<Value, R>(&element_script(body), args)
            .await
            .with_context(|| format!("Query failed for {}", locator))?;
        Ok(result)
    }
}

/// Resolves a serialized [`Locator`] to a list of elements inside the page
const RESOLVE_JS: &str = r#"
    const resolve = (loc) => {
        const all = (sel) => Array.from(document.querySelectorAll(sel));
        switch (loc.kind) {
            case 'css': return all(loc.value);
            case 'name': return all('[name="' + CSS.escape(loc.value) + '"]');
            case 'id': {
                const el = document.getElementById(loc.value);
                return el ? [el] : [];
            }
            case 'xpath': {
                const snap = document.evaluate(loc.value, document, null,
                    XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                const out = [];
                for (let i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i));
                return out;
            }
            case 'text': return all('body *').filter(el =>
                Array.from(el.childNodes).some(n =>
                    n.nodeType === Node.TEXT_NODE && n.textContent.trim() === loc.value));
            default: return [];
        }
    };
    const visible = (el) => {
        if (!el || !el.isConnected) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
            return false;
        }
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    };
    const textOf = (el) => (el.innerText || el.textContent || '').trim();
"#;

fn element_script(body: &str) -> String {
    format!("(args) => {{ {} {} }}", RESOLVE_JS, body)
}

#[async_trait]
impl BrowserSession for WebDriver {
    fn browser_name(&self) -> &str {
        self.config.browser_type.as_str()
    }

    async fn goto(&self, url: &str) -> Result<()> {
        log::debug!("goto {}", url);
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page
            .evaluate::<(), String>("() => window.location.href", ())
            .await?)
    }

    async fn title(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.evaluate::<(), String>("() => document.title", ()).await?)
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.query("return resolve(args.locator).length;", locator, Value::Null)
            .await
    }

    async fn is_displayed(&self, locator: &Locator) -> Result<bool> {
        self.query("return visible(resolve(args.locator)[0]);", locator, Value::Null)
            .await
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool> {
        self.query(
            "const el = resolve(args.locator)[0];
             return !!el && !el.disabled && el.getAttribute('aria-disabled') !== 'true';",
            locator,
            Value::Null,
        )
        .await
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        self.query(
            "const el = resolve(args.locator)[0]; return el ? textOf(el) : null;",
            locator,
            Value::Null,
        )
        .await
    }

    async fn visible_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        self.query(
            "return resolve(args.locator).filter(visible).map(textOf);",
            locator,
            Value::Null,
        )
        .await
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.query(
            "const el = resolve(args.locator)[0]; return el ? el.getAttribute(args.extra) : null;",
            locator,
            Value::String(name.to_string()),
        )
        .await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let sel = locator.to_playwright();
        let page = self.page.lock().await;
        page.click_builder(&sel)
            .click()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to click {}: {:?}", locator, e))?;
        Ok(())
    }

    async fn js_click(&self, locator: &Locator) -> Result<()> {
        let clicked: bool = self
            .query(
                "const el = resolve(args.locator)[0];
                 if (!el) return false;
                 el.scrollIntoView({ block: 'center' });
                 el.click();
                 return true;",
                locator,
                Value::Null,
            )
            .await?;
        if !clicked {
            anyhow::bail!("Element not found for {}", locator);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let sel = locator.to_playwright();
        let page = self.page.lock().await;
        let el = page
            .query_selector(&sel)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Element not found for {}", locator))?;
        el.fill_builder(text).fill().await?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration) -> Result<()> {
        self.click(locator).await?;
        let page = self.page.lock().await;
        for ch in text.chars() {
            page.keyboard.input_text(&ch.to_string()).await?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        let hovered: bool = self
            .query(
                "const el = resolve(args.locator)[0];
                 if (!el) return false;
                 el.scrollIntoView({ block: 'center' });
                 for (const type of ['mouseover', 'mouseenter']) {
                     el.dispatchEvent(new MouseEvent(type, { bubbles: true }));
                 }
                 return true;",
                locator,
                Value::Null,
            )
            .await?;
        if !hovered {
            anyhow::bail!("Element not found for {}", locator);
        }
        Ok(())
    }

    async fn execute_script(&self, script: &str, arg: Value) -> Result<Value> {
        let page = self.page.lock().await;
        Ok(page.evaluate::<Value, Value>(script, arg).await?)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path.to_path_buf())
            .screenshot()
            .await?;
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.content().await?)
    }

    async fn close(&self) -> Result<()> {
        self.browser.close().await?;
        log::debug!("Closed {}", self.config.browser_type.as_str());
        Ok(())
    }
}

/// Opens a new Playwright-backed [`WebDriver`] per scenario
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    config: WebDriverConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionLauncher for PlaywrightLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let driver = WebDriver::new(self.config.clone()).await?;
        Ok(Box::new(driver))
    }
}

/// Launch Chromium, preferring an explicit or locally installed executable
async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<Browser> {
    let mut launcher = chromium.launcher().headless(config.headless);

    let executable = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
        .ok()
        .map(PathBuf::from)
        .or_else(find_system_browser);

    if let Some(ref path) = executable {
        log::info!("Using browser executable: {}", path.display());
        launcher = launcher.executable(path);
    } else {
        log::info!("No browser executable found, using Playwright's bundled Chromium");
    }

    let args: Vec<String> = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    launcher = launcher.args(&args);

    Ok(launcher.launch().await?)
}

fn find_system_browser() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}
