use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// How a page element is located
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Locator {
    /// CSS selector, may contain a comma-separated list of alternatives
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
    /// Element whose own text, trimmed, equals the value
    Text(String),
    /// `name` attribute
    Name(String),
    Id(String),
}

impl Locator {
    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Locator::XPath(s.into())
    }

    pub fn name(s: impl Into<String>) -> Self {
        Locator::Name(s.into())
    }

    /// Selector string understood by Playwright's selector engines
    pub fn to_playwright(&self) -> String {
        match self {
            Locator::Css(s) => s.clone(),
            Locator::XPath(x) => format!("xpath={}", x),
            Locator::Text(t) => format!("text={}", quote(t)),
            Locator::Name(n) => format!("[name={}]", quote(n)),
            Locator::Id(id) => format!("[id={}]", quote(id)),
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css '{}'", s),
            Locator::XPath(x) => write!(f, "xpath '{}'", x),
            Locator::Text(t) => write!(f, "text '{}'", t),
            Locator::Name(n) => write!(f, "name '{}'", n),
            Locator::Id(id) => write!(f, "id '{}'", id),
        }
    }
}

/// One live browser window driven by a scenario
///
/// Every query reads the current DOM once; retrying belongs to the page
/// objects, which wrap these calls in bounded polls. Queries on missing
/// elements answer "absent" (`0`, `false`, `None`) rather than erroring.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Browser engine name ("chromium", "firefox", "webkit")
    fn browser_name(&self) -> &str;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Number of elements currently matching
    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// True when the first match exists and is rendered
    async fn is_displayed(&self, locator: &Locator) -> Result<bool>;

    async fn is_enabled(&self, locator: &Locator) -> Result<bool>;

    /// Trimmed visible text of the first match
    async fn text(&self, locator: &Locator) -> Result<Option<String>>;

    /// Trimmed texts of all displayed matches, in document order
    async fn visible_texts(&self, locator: &Locator) -> Result<Vec<String>>;

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Click through the DOM, bypassing overlays that intercept pointer events
    async fn js_click(&self, locator: &Locator) -> Result<()>;

    /// Replace the value of an input
    async fn fill(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Focus the element and type one character at a time
    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration) -> Result<()>;

    async fn hover(&self, locator: &Locator) -> Result<()>;

    /// Run a script; `arg` is passed as the script function's only parameter
    async fn execute_script(
        &self,
        script: &str,
        arg: serde_json::Value,
    ) -> Result<serde_json::Value>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn page_source(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

/// Opens a fresh session for every scenario
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}
