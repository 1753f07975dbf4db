use anyhow::{Context, Result};
use std::time::Duration;

use crate::driver::poll::{self, CancelFlag, PollConfig, PollError};
use crate::driver::traits::{BrowserSession, Locator};
use crate::utils::config::Config;

/// Timeout for best-effort visibility checks
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits and element helpers shared by every page object
///
/// The session is passed to each call; a page object never owns it.
#[derive(Debug, Clone)]
pub struct BasePage {
    poll: PollConfig,
    page_load_timeout: Duration,
}

impl BasePage {
    pub fn new(poll: PollConfig, page_load_timeout: Duration) -> Self {
        Self {
            poll,
            page_load_timeout,
        }
    }

    /// Waits from the run configuration, all ending early on `cancel`
    pub fn from_config(config: &Config, cancel: &CancelFlag) -> Self {
        Self::new(
            config.poll_config().with_cancel(cancel.clone()),
            config.page_load_timeout(),
        )
    }

    /// Default wait configuration
    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }

    /// Default configuration with another timeout
    pub fn within(&self, timeout: Duration) -> PollConfig {
        self.poll.with_timeout(timeout)
    }

    /// Wait until the element is displayed
    pub async fn find(&self, session: &dyn BrowserSession, locator: &Locator) -> Result<()> {
        poll::wait_until(&self.poll, || session.is_displayed(locator))
            .await
            .with_context(|| format!("Element {} not visible", locator))
    }

    /// Wait until displayed and enabled, then click
    pub async fn click(&self, session: &dyn BrowserSession, locator: &Locator) -> Result<()> {
        poll::wait_until(&self.poll, || async move {
            Ok::<_, anyhow::Error>(
                session.is_displayed(locator).await? && session.is_enabled(locator).await?,
            )
        })
        .await
        .with_context(|| format!("Element {} not clickable", locator))?;

        log::debug!("click {}", locator);
        session.click(locator).await
    }

    pub async fn enter_text(
        &self,
        session: &dyn BrowserSession,
        locator: &Locator,
        text: &str,
    ) -> Result<()> {
        self.find(session, locator).await?;
        session.fill(locator, text).await
    }

    pub async fn get_text(&self, session: &dyn BrowserSession, locator: &Locator) -> Result<String> {
        self.find(session, locator).await?;
        Ok(session.text(locator).await?.unwrap_or_default())
    }

    /// Existence check: `false` after `timeout`, an error only on cancel
    pub async fn is_visible(
        &self,
        session: &dyn BrowserSession,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        let config = timeout.map_or_else(|| self.poll.clone(), |t| self.within(t));
        Ok(poll::holds_within(&config, || session.is_displayed(locator)).await?)
    }

    pub async fn wait_for_url_contains(
        &self,
        session: &dyn BrowserSession,
        fragment: &str,
        timeout: Option<Duration>,
    ) -> Result<(), PollError> {
        let config = timeout.map_or_else(|| self.poll.clone(), |t| self.within(t));
        poll::wait_until(&config, || async move {
            session.current_url().await.map(|url| url.contains(fragment))
        })
        .await
    }

    pub async fn wait_for_url_not_contains(
        &self,
        session: &dyn BrowserSession,
        fragment: &str,
        timeout: Option<Duration>,
    ) -> Result<(), PollError> {
        let config = timeout.map_or_else(|| self.poll.clone(), |t| self.within(t));
        poll::wait_until(&config, || async move {
            session.current_url().await.map(|url| !url.contains(fragment))
        })
        .await
    }

    /// True once the element is gone or hidden
    pub async fn wait_for_absence(
        &self,
        session: &dyn BrowserSession,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        let config = timeout.map_or_else(|| self.poll.clone(), |t| self.within(t));
        let gone = poll::holds_within(&config, || async move {
            session.is_displayed(locator).await.map(|shown| !shown)
        })
        .await?;
        Ok(gone)
    }

    /// Fixed delay on the run's cancel flag
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        poll::pause(&self.poll, duration)
            .await
            .with_context(|| format!("Pause of {}ms interrupted", duration.as_millis()))
    }

    /// Wait for `document.readyState == "complete"`
    pub async fn wait_for_ready(&self, session: &dyn BrowserSession) -> Result<()> {
        let config = self.within(self.page_load_timeout);
        poll::wait_until(&config, || async move {
            let state = session
                .execute_script("() => document.readyState", serde_json::Value::Null)
                .await?;
            Ok::<_, anyhow::Error>(state.as_str() == Some("complete"))
        })
        .await
        .context("Page did not finish loading")
    }

    pub async fn navigate_to(&self, session: &dyn BrowserSession, url: &str) -> Result<()> {
        log::info!("Navigating to {}", url);
        session.goto(url).await?;
        self.wait_for_ready(session).await
    }
}
