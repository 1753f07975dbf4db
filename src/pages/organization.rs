//! Organization dashboard reached from the search (`/org/<id>`)
//!
//! Tabs, tags and dashboard cards are closed enums: a feature file naming an
//! unknown one fails when it is parsed, not halfway through a run.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use super::base::{BasePage, SHORT_TIMEOUT};
use super::TargetError;
use crate::driver::poll::{self, PollError};
use crate::driver::traits::{BrowserSession, Locator};

/// Time for a hovered card to show its overlay
const HOVER_SETTLE: Duration = Duration::from_millis(300);

/// Match a UI name against the known display names, ignoring case and separators
fn parse_target<T: Copy>(kind: &'static str, name: &str, all: &[T], label: fn(&T) -> &'static str) -> Result<T, TargetError> {
    let wanted = normalize(name);
    all.iter()
        .copied()
        .find(|t| normalize(label(t)) == wanted)
        .ok_or_else(|| TargetError::Unknown {
            kind,
            name: name.to_string(),
            expected: all.iter().map(|t| label(t).to_string()).collect(),
        })
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

macro_rules! ui_target {
    ($name:ident, $kind:literal, [$($variant:ident => $label:literal),+ $(,)?]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Text shown in the UI
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = TargetError;

            fn from_str(s: &str) -> Result<Self, TargetError> {
                parse_target($kind, s, Self::ALL, Self::label)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TargetError;

            fn try_from(s: String) -> Result<Self, TargetError> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(t: $name) -> String {
                t.label().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

ui_target!(Tab, "tab", [
    Overview => "OVERVIEW",
    PaymentAssurance => "PAYMENT ASSURANCE",
    MikeDashboard => "MIKE DASHBOARD",
]);

ui_target!(Card, "card", [
    Loans => "Loans",
    Assets => "Assets",
    RecoveryOrders => "Recovery Orders",
    Vehicles => "Vehicles",
    Media => "Media",
    Geofences => "Geofences",
]);

ui_target!(Tag, "tag", [
    Dealer => "Dealer",
    StolenVehicleRecovery => "Stolen Vehicle Recovery",
    PaymentAssurance => "Payment Assurance",
]);

impl Tab {
    pub fn locator(&self) -> Locator {
        Locator::xpath(format!(
            "//div[contains(@class, 'mat-tab-label') or @role='tab'][contains(., '{}')]",
            self.label()
        ))
    }
}

impl Card {
    pub fn locator(&self) -> Locator {
        Locator::xpath(format!(
            "//*[contains(@class, 'card') or contains(@class, 'mat-card')][.//text()[contains(., '{}')]]",
            self.label()
        ))
    }
}

impl Tag {
    pub fn locator(&self) -> Locator {
        match self {
            // The tab of the same name must not count as the tag
            Tag::PaymentAssurance => Locator::xpath(
                "//*[contains(text(), 'Payment Assurance') and not(ancestor::*[contains(@class, 'tab')])]",
            ),
            other => Locator::xpath(format!("//*[contains(text(), '{}')]", other.label())),
        }
    }
}

/// Organization dashboard
#[derive(Debug, Clone)]
pub struct OrganizationPage {
    base: BasePage,
    breadcrumb: Locator,
    headings: Locator,
    active_tab: Locator,
    created_date: Locator,
    updated_date: Locator,
}

impl OrganizationPage {
    pub fn new(base: BasePage) -> Self {
        Self {
            base,
            breadcrumb: Locator::css(".breadcrumb, [class*='breadcrumb']"),
            headings: Locator::css("h1, h2, h3"),
            active_tab: Locator::css(".mat-tab-label-active, [aria-selected='true']"),
            created_date: Locator::xpath("//*[contains(text(), 'Created:')]"),
            updated_date: Locator::xpath("//*[contains(text(), 'Updated:')]"),
        }
    }

    /// URL moved to an organization route
    pub async fn is_loaded(&self, session: &dyn BrowserSession) -> Result<bool> {
        match self.base.wait_for_url_contains(session, "/org/", None).await {
            Ok(()) => Ok(true),
            Err(PollError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Heading carrying the organization name
    ///
    /// Tries a dedicated name element first, then any heading containing
    /// `expected`. `None` when neither shows up.
    pub async fn organization_name(
        &self,
        session: &dyn BrowserSession,
        expected: &str,
    ) -> Result<Option<String>> {
        let name = org_name_locator(expected);
        if self.base.is_visible(session, &name, Some(SHORT_TIMEOUT)).await? {
            return session.text(&name).await;
        }

        let headings = session.visible_texts(&self.headings).await?;
        Ok(headings.into_iter().find(|h| h.contains(expected)))
    }

    /// Best effort: `None` when the page has no breadcrumb
    pub async fn breadcrumb(&self, session: &dyn BrowserSession) -> Result<Option<String>> {
        if !self
            .base
            .is_visible(session, &self.breadcrumb, Some(SHORT_TIMEOUT))
            .await?
        {
            return Ok(None);
        }
        Ok(session
            .text(&self.breadcrumb)
            .await?
            .filter(|t| !t.is_empty()))
    }

    pub async fn is_tag_visible(&self, session: &dyn BrowserSession, tag: Tag) -> Result<bool> {
        self.base
            .is_visible(session, &tag.locator(), Some(SHORT_TIMEOUT))
            .await
    }

    /// Known tags currently displayed
    pub async fn visible_tags(&self, session: &dyn BrowserSession) -> Result<Vec<Tag>> {
        let mut shown = Vec::new();
        for tag in Tag::ALL {
            if session.is_displayed(&tag.locator()).await? {
                shown.push(*tag);
            }
        }
        Ok(shown)
    }

    pub async fn created_date(&self, session: &dyn BrowserSession) -> Result<Option<String>> {
        self.optional_text(session, &self.created_date).await
    }

    pub async fn updated_date(&self, session: &dyn BrowserSession) -> Result<Option<String>> {
        self.optional_text(session, &self.updated_date).await
    }

    pub async fn is_tab_visible(&self, session: &dyn BrowserSession, tab: Tab) -> Result<bool> {
        self.base
            .is_visible(session, &tab.locator(), Some(SHORT_TIMEOUT))
            .await
    }

    pub async fn click_tab(&self, session: &dyn BrowserSession, tab: Tab) -> Result<()> {
        let locator = tab.locator();
        self.base.find(session, &locator).await?;
        session.js_click(&locator).await?;
        log::info!("Opened tab {}", tab);
        Ok(())
    }

    /// Waits briefly for the tab to become the selected one
    pub async fn is_tab_active(&self, session: &dyn BrowserSession, tab: Tab) -> Result<bool> {
        let active = &self.active_tab;
        let selected = poll::holds_within(&self.base.within(SHORT_TIMEOUT), || async move {
            let text = session.text(active).await?.unwrap_or_default();
            Ok::<_, anyhow::Error>(text.to_uppercase().contains(tab.label()))
        })
        .await?;
        Ok(selected)
    }

    pub async fn is_card_visible(&self, session: &dyn BrowserSession, card: Card) -> Result<bool> {
        self.base
            .is_visible(session, &card.locator(), Some(SHORT_TIMEOUT))
            .await
    }

    pub async fn click_card(&self, session: &dyn BrowserSession, card: Card) -> Result<()> {
        let locator = card.locator();
        self.base.find(session, &locator).await?;
        session.js_click(&locator).await?;
        log::info!("Opened card {}", card);
        Ok(())
    }

    pub async fn hover_card(&self, session: &dyn BrowserSession, card: Card) -> Result<()> {
        let locator = card.locator();
        self.base.find(session, &locator).await?;
        session.hover(&locator).await?;
        self.base.pause(HOVER_SETTLE).await
    }

    /// First number in the card text, if the card shows one
    pub async fn card_count(&self, session: &dyn BrowserSession, card: Card) -> Result<Option<u64>> {
        let text = self.optional_text(session, &card.locator()).await?;
        Ok(text.as_deref().and_then(first_number))
    }

    async fn optional_text(
        &self,
        session: &dyn BrowserSession,
        locator: &Locator,
    ) -> Result<Option<String>> {
        if !self
            .base
            .is_visible(session, locator, Some(SHORT_TIMEOUT))
            .await?
        {
            return Ok(None);
        }
        session.text(locator).await
    }
}

fn org_name_locator(expected: &str) -> Locator {
    let literal = xpath_literal(expected);
    Locator::xpath(format!(
        "//h1[contains(text(), {0})] | //h2[contains(text(), {0})] | //*[contains(@class, 'org-name') and contains(text(), {0})]",
        literal
    ))
}

/// XPath string literal, using `concat()` when both quote kinds occur
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn first_number(text: &str) -> Option<u64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    re.find(text)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeElement, FakeSession};
    use crate::driver::poll::PollConfig;

    fn org_page() -> OrganizationPage {
        OrganizationPage::new(BasePage::new(
            PollConfig::from_millis(1000).with_interval(Duration::from_millis(100)),
            Duration::from_secs(2),
        ))
    }

    #[test]
    fn test_targets_parse_case_insensitively() {
        assert_eq!("payment assurance".parse::<Tab>().unwrap(), Tab::PaymentAssurance);
        assert_eq!("MIKE_DASHBOARD".parse::<Tab>().unwrap(), Tab::MikeDashboard);
        assert_eq!("recovery orders".parse::<Card>().unwrap(), Card::RecoveryOrders);
        assert_eq!("Stolen Vehicle Recovery".parse::<Tag>().unwrap(), Tag::StolenVehicleRecovery);
    }

    #[test]
    fn test_unknown_target_fails_closed() {
        let err = "Invoices".parse::<Card>().unwrap_err();
        match &err {
            TargetError::Unknown { kind, name, expected } => {
                assert_eq!(*kind, "card");
                assert_eq!(name, "Invoices");
                assert_eq!(expected.len(), 6);
            }
        }
        assert!(err.to_string().contains("Geofences"));
    }

    #[test]
    fn test_targets_deserialize_from_yaml_strings() {
        let tab: Tab = serde_yaml::from_str("Overview").unwrap();
        assert_eq!(tab, Tab::Overview);
        assert!(serde_yaml::from_str::<Card>("Invoices").is_err());
    }

    #[test]
    fn test_locators_carry_labels() {
        assert!(Tab::Overview.locator().to_playwright().contains("'OVERVIEW'"));
        assert!(Card::Geofences.locator().to_playwright().contains("'Geofences'"));
        assert!(Tag::PaymentAssurance
            .locator()
            .to_playwright()
            .contains("not(ancestor::"));
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("Loans\n1,234"), Some(1));
        assert_eq!(first_number("42 Vehicles"), Some(42));
        assert_eq!(first_number("Media"), None);
    }

    #[test]
    fn test_xpath_literal() {
        assert_eq!(xpath_literal("ASEED"), "'ASEED'");
        assert_eq!(xpath_literal("O'Hara"), "\"O'Hara\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_loaded_checks_org_route() {
        let page = org_page();
        assert!(page.is_loaded(&FakeSession::new().with_url("https://app/org/42")).await.unwrap());
        assert!(!page.is_loaded(&FakeSession::new().with_url("https://app/dashboard")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_organization_name_falls_back_to_headings() {
        let session = FakeSession::new()
            .with_element(Locator::css("h1, h2, h3"), FakeElement::visible("Welcome"))
            .with_element(Locator::css("h1, h2, h3"), FakeElement::visible("ASEED Overview"));

        let name = org_page().organization_name(&session, "ASEED").await.unwrap();
        assert_eq!(name.as_deref(), Some("ASEED Overview"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_breadcrumb_is_optional() {
        assert_eq!(org_page().breadcrumb(&FakeSession::new()).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_card_count_and_click() {
        let session = FakeSession::new()
            .with_element(Card::Vehicles.locator(), FakeElement::visible("17\nVehicles"));
        let page = org_page();

        assert_eq!(page.card_count(&session, Card::Vehicles).await.unwrap(), Some(17));
        assert_eq!(page.card_count(&session, Card::Media).await.unwrap(), None);
        page.click_card(&session, Card::Vehicles).await.unwrap();
        assert_eq!(session.state().clicks, vec![Card::Vehicles.locator()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_card_settles() {
        let session = FakeSession::new()
            .with_element(Card::Assets.locator(), FakeElement::visible("4 Assets"));
        let started = tokio::time::Instant::now();

        org_page().hover_card(&session, Card::Assets).await.unwrap();
        assert_eq!(session.state().hovers, vec![Card::Assets.locator()]);
        assert!(started.elapsed() >= HOVER_SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_card_ends_on_cancel() {
        let cancel = crate::driver::poll::CancelFlag::new();
        cancel.cancel();
        let page = OrganizationPage::new(BasePage::new(
            PollConfig::from_millis(1000).with_cancel(cancel),
            Duration::from_secs(2),
        ));
        let session = FakeSession::new()
            .with_element(Card::Assets.locator(), FakeElement::visible("4 Assets"));

        assert!(page.hover_card(&session, Card::Assets).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_active() {
        let session = FakeSession::new().with_element(
            Locator::css(".mat-tab-label-active, [aria-selected='true']"),
            FakeElement::visible("Overview"),
        );
        let page = org_page();
        assert!(page.is_tab_active(&session, Tab::Overview).await.unwrap());
        assert!(!page.is_tab_active(&session, Tab::MikeDashboard).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_tags() {
        let session = FakeSession::new()
            .with_element(Tag::Dealer.locator(), FakeElement::visible("Dealer"))
            .with_element(Tag::PaymentAssurance.locator(), FakeElement::hidden("Payment Assurance"));
        assert_eq!(org_page().visible_tags(&session).await.unwrap(), vec![Tag::Dealer]);
    }
}
