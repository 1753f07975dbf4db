//! Scriptable in-memory [`BrowserSession`] for unit tests

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use super::traits::{BrowserSession, Locator, SessionLauncher};

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub attributes: HashMap<String, String>,
    /// Element is absent until this long after the session was created
    pub appears_after: Duration,
    /// Element is absent from this point on
    pub disappears_after: Option<Duration>,
}

impl FakeElement {
    pub fn visible(text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible: true,
            enabled: true,
            attributes: HashMap::new(),
            appears_after: Duration::ZERO,
            disappears_after: None,
        }
    }

    pub fn hidden(text: &str) -> Self {
        Self {
            visible: false,
            ..Self::visible(text)
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn appearing_after(mut self, d: Duration) -> Self {
        self.appears_after = d;
        self
    }

    pub fn disappearing_after(mut self, d: Duration) -> Self {
        self.disappears_after = Some(d);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub url: String,
    pub title: String,
    pub elements: HashMap<Locator, Vec<FakeElement>>,
    /// Clicking the locator moves to this URL
    pub navigate_on_click: HashMap<Locator, String>,
    /// Script replies keyed by a substring of the script text
    pub scripts: Vec<(String, Value)>,
    pub visits: Vec<String>,
    pub clicks: Vec<Locator>,
    pub fills: Vec<(Locator, String)>,
    pub hovers: Vec<Locator>,
    pub executed: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub closed: bool,
}

/// Shared handle so tests can inspect a session after handing it away
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub state: Arc<Mutex<FakeState>>,
    created: Instant,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                url: "about:blank".to_string(),
                ..Default::default()
            })),
            created: Instant::now(),
        }
    }

    pub fn with_url(self, url: &str) -> Self {
        self.state().url = url.to_string();
        self
    }

    pub fn with_title(self, title: &str) -> Self {
        self.state().title = title.to_string();
        self
    }

    pub fn with_element(self, locator: Locator, element: FakeElement) -> Self {
        self.state()
            .elements
            .entry(locator)
            .or_default()
            .push(element);
        self
    }

    pub fn navigating_on_click(self, locator: Locator, url: &str) -> Self {
        self.state()
            .navigate_on_click
            .insert(locator, url.to_string());
        self
    }

    pub fn with_script(self, needle: &str, reply: Value) -> Self {
        self.state().scripts.push((needle.to_string(), reply));
        self
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn present(&self, locator: &Locator) -> Vec<FakeElement> {
        let age = self.created.elapsed();
        self.state()
            .elements
            .get(locator)
            .map(|els| {
                els.iter()
                    .filter(|e| age >= e.appears_after)
                    .filter(|e| e.disappears_after.map_or(true, |d| age < d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn first(&self, locator: &Locator) -> Option<FakeElement> {
        self.present(locator).into_iter().next()
    }

    fn require(&self, locator: &Locator) -> Result<FakeElement> {
        self.first(locator)
            .ok_or_else(|| anyhow::anyhow!("Element not found for {}", locator))
    }

    fn record_click(&self, locator: &Locator) {
        let mut state = self.state();
        state.clicks.push(locator.clone());
        if let Some(url) = state.navigate_on_click.get(locator).cloned() {
            state.url = url;
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn browser_name(&self) -> &str {
        "fake"
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.visits.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state().title.clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.present(locator).len())
    }

    async fn is_displayed(&self, locator: &Locator) -> Result<bool> {
        Ok(self.first(locator).map_or(false, |e| e.visible))
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool> {
        Ok(self.first(locator).map_or(false, |e| e.enabled))
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(self.first(locator).map(|e| e.text.trim().to_string()))
    }

    async fn visible_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        Ok(self
            .present(locator)
            .into_iter()
            .filter(|e| e.visible)
            .map(|e| e.text.trim().to_string())
            .collect())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        Ok(self
            .first(locator)
            .and_then(|e| e.attributes.get(name).cloned()))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let el = self.require(locator)?;
        if !el.visible || !el.enabled {
            anyhow::bail!("Element {} is not clickable", locator);
        }
        self.record_click(locator);
        Ok(())
    }

    async fn js_click(&self, locator: &Locator) -> Result<()> {
        self.require(locator)?;
        self.record_click(locator);
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        self.require(locator)?;
        self.state().fills.push((locator.clone(), text.to_string()));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str, _delay: Duration) -> Result<()> {
        self.fill(locator, text).await
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        self.require(locator)?;
        self.state().hovers.push(locator.clone());
        Ok(())
    }

    async fn execute_script(&self, script: &str, _arg: Value) -> Result<Value> {
        let mut state = self.state();
        state.executed.push(script.to_string());
        Ok(state
            .scripts
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Value::Null))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.state().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        Ok("<html></html>".to_string())
    }

    async fn close(&self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }
}

/// Hands out clones of prepared sessions, one per launch
pub struct FakeLauncher {
    sessions: Mutex<Vec<FakeSession>>,
    pub launched: Mutex<Vec<FakeSession>>,
}

impl FakeLauncher {
    pub fn new(sessions: Vec<FakeSession>) -> Self {
        let mut sessions = sessions;
        sessions.reverse();
        Self {
            sessions: Mutex::new(sessions),
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn launched(&self) -> Vec<FakeSession> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let session = self
            .sessions
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_default();
        self.launched.lock().unwrap().push(session.clone());
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attribute_lookup() {
        let session = FakeSession::new().with_element(
            Locator::css("a.logo"),
            FakeElement::visible("EM2M").with_attribute("href", "/dashboard"),
        );

        let href = session.attribute(&Locator::css("a.logo"), "href").await.unwrap();
        assert_eq!(href.as_deref(), Some("/dashboard"));
        let missing = session.attribute(&Locator::css("a.logo"), "title").await.unwrap();
        assert_eq!(missing, None);
    }
}
