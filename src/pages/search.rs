//! Navbar search with its autocomplete dropdown
//!
//! The search input has no stable selector: it is created when the navbar
//! search button is clicked. Opening the search marks every input visible at
//! that moment, clicks the button, then tags the first visible unmarked input
//! with `data-em2m-search` so later steps can address it.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{BasePage, SHORT_TIMEOUT};
use crate::driver::poll;
use crate::driver::traits::{BrowserSession, Locator};

const SEARCH_INPUT_SELECTOR: &str = "input[data-em2m-search]";
const OPTION_SELECTOR: &str = "mat-option[role='option']";
const TYPING_DELAY: Duration = Duration::from_millis(100);
const DROPDOWN_TIMEOUT: Duration = Duration::from_secs(15);

const VISIBLE_JS: &str = r#"
    const visible = (el) => {
        if (!el || !el.isConnected) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    };
"#;

const OPEN_SEARCH_JS: &str = r#"
    document.querySelectorAll('[data-em2m-search]').forEach(el => el.removeAttribute('data-em2m-search'));
    document.querySelectorAll('input').forEach(el => {
        if (visible(el)) el.setAttribute('data-em2m-seen', '');
    });
    const searchButton = Array.from(document.querySelectorAll('button')).find(b =>
        visible(b) && (b.innerText || '').trim().toLowerCase().includes('search'));
    if (!searchButton) return false;
    searchButton.click();
    return true;
"#;

const DETECT_INPUT_JS: &str = r#"
    const inputs = Array.from(document.querySelectorAll('input')).filter(visible);
    let candidate = inputs.find(el => !el.hasAttribute('data-em2m-seen'));
    if (!candidate && args.fallback) candidate = inputs[inputs.length - 1];
    if (!candidate) return false;
    document.querySelectorAll('[data-em2m-seen]').forEach(el => el.removeAttribute('data-em2m-seen'));
    candidate.setAttribute('data-em2m-search', '');
    return true;
"#;

const PREPARE_INPUT_JS: &str = r#"
    const el = document.querySelector('input[data-em2m-search]');
    if (!el) return false;
    el.focus();
    el.value = '';
    return true;
"#;

const FIRE_EVENTS_JS: &str = r#"
    const el = document.querySelector('input[data-em2m-search]');
    if (!el) return false;
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('keyup', { bubbles: true }));
    return true;
"#;

const CLICK_OPTION_JS: &str = r#"
    const options = Array.from(document.querySelectorAll("mat-option[role='option']")).filter(visible);
    const wanted = args.text.trim();
    const pickedOption = args.exact
        ? options.find(o => (o.innerText || '').trim() === wanted)
        : options.find(o => (o.innerText || '').toLowerCase().includes(wanted.toLowerCase()));
    if (!pickedOption) return false;
    pickedOption.click();
    return true;
"#;

fn script(body: &str) -> String {
    format!("(args) => {{ {} {} }}", VISIBLE_JS, body)
}

/// Navbar search and its autocomplete options
#[derive(Debug, Clone)]
pub struct SearchPage {
    base: BasePage,
    search_input: Locator,
    dropdown: Locator,
    options: Locator,
}

impl SearchPage {
    pub fn new(base: BasePage) -> Self {
        Self {
            base,
            search_input: Locator::css(SEARCH_INPUT_SELECTOR),
            dropdown: Locator::css(
                ".mat-mdc-autocomplete-panel, .mat-autocomplete-panel, .cdk-overlay-pane",
            ),
            options: Locator::css(OPTION_SELECTOR),
        }
    }

    /// Click the navbar search button and locate the input it reveals
    pub async fn open_search(&self, session: &dyn BrowserSession) -> Result<()> {
        let open = script(OPEN_SEARCH_JS);
        poll::wait_until(self.base.poll(), || {
            let open = open.as_str();
            async move { run_flag(session, open, Value::Null).await }
        })
        .await
        .context("Could not find search button on navbar")?;

        let detect = script(DETECT_INPUT_JS);
        let found = poll::holds_within(&self.base.within(SHORT_TIMEOUT), || {
            let detect = detect.as_str();
            async move { run_flag(session, detect, json!({ "fallback": false })).await }
        })
        .await?;

        if !found {
            log::debug!("No new input appeared after opening search, using last visible input");
            if !run_flag(session, &detect, json!({ "fallback": true })).await? {
                anyhow::bail!("Search input did not appear after clicking the search button");
            }
        }
        Ok(())
    }

    /// Type into the revealed input character by character
    pub async fn enter_search_term(&self, session: &dyn BrowserSession, term: &str) -> Result<()> {
        if !run_flag(session, &script(PREPARE_INPUT_JS), Value::Null).await? {
            anyhow::bail!("Search input not found. Open the search before typing");
        }

        log::info!("Typing '{}' into search", term);
        session
            .type_text(&self.search_input, term, TYPING_DELAY)
            .await?;
        run_flag(session, &script(FIRE_EVENTS_JS), Value::Null).await?;
        Ok(())
    }

    /// Best-effort wait for autocomplete options; `Ok(false)` when none appear
    pub async fn wait_for_dropdown(&self, session: &dyn BrowserSession) -> Result<bool> {
        let options = &self.options;
        let shown = poll::holds_within(&self.base.within(DROPDOWN_TIMEOUT), || async move {
            session.count(options).await.map(|n| n > 0)
        })
        .await?;
        if !shown {
            log::warn!("Search dropdown did not appear, continuing");
        }
        Ok(shown)
    }

    pub async fn is_dropdown_visible(&self, session: &dyn BrowserSession) -> Result<bool> {
        self.base
            .is_visible(session, &self.dropdown, Some(SHORT_TIMEOUT))
            .await
    }

    pub async fn option_texts(&self, session: &dyn BrowserSession) -> Result<Vec<String>> {
        session.visible_texts(&self.options).await
    }

    pub async fn click_exact_match(&self, session: &dyn BrowserSession, text: &str) -> Result<()> {
        self.click_option(session, text, true).await
    }

    pub async fn click_partial_match(&self, session: &dyn BrowserSession, text: &str) -> Result<()> {
        self.click_option(session, text, false).await
    }

    async fn click_option(&self, session: &dyn BrowserSession, text: &str, exact: bool) -> Result<()> {
        let options = &self.options;
        poll::wait_until(&self.base.within(Duration::from_secs(10)), || async move {
            session.count(options).await.map(|n| n > 0)
        })
        .await
        .context("No options in search dropdown")?;

        let available = self.option_texts(session).await?;
        let wanted = text.trim();
        let present = if exact {
            available.iter().any(|o| o == wanted)
        } else {
            let wanted = wanted.to_lowercase();
            available.iter().any(|o| o.to_lowercase().contains(&wanted))
        };

        let kind = if exact { "Exact" } else { "Partial" };
        if !present {
            anyhow::bail!(
                "{} match '{}' not found in dropdown. Available options: {:?}",
                kind,
                text,
                available
            );
        }

        if !run_flag(session, &script(CLICK_OPTION_JS), json!({ "text": text, "exact": exact })).await? {
            anyhow::bail!("{} match '{}' disappeared before it could be clicked", kind, text);
        }
        log::info!("Selected '{}' from search results", text);
        Ok(())
    }

    pub async fn is_text_in_dropdown(&self, session: &dyn BrowserSession, text: &str) -> Result<bool> {
        let wanted = text.to_lowercase();
        Ok(self
            .option_texts(session)
            .await?
            .iter()
            .any(|o| o.to_lowercase().contains(&wanted)))
    }

    /// Open, type, wait for the dropdown, select the exact match
    pub async fn search_and_select(&self, session: &dyn BrowserSession, term: &str) -> Result<()> {
        self.open_search(session).await?;
        self.enter_search_term(session, term).await?;
        self.wait_for_dropdown(session).await?;
        self.click_exact_match(session, term).await
    }
}

async fn run_flag(session: &dyn BrowserSession, script: &str, arg: Value) -> Result<bool> {
    Ok(session.execute_script(script, arg).await?.as_bool().unwrap_or(false))
}
