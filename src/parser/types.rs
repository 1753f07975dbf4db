use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::driver::traits::Locator;
use crate::pages::{Card, Tab, Tag};

/// A parsed feature file
#[derive(Debug, Clone, Default)]
pub struct FeatureFile {
    pub name: String,
    pub description: Option<String>,
    pub path: PathBuf,
    pub tags: Vec<String>,
    /// Steps run before every scenario of the feature
    pub background: Vec<Step>,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Scenario tags plus the feature's own
    pub fn effective_tags<'a>(&'a self, feature: &'a FeatureFile) -> impl Iterator<Item = &'a str> {
        feature
            .tags
            .iter()
            .chain(self.tags.iter())
            .map(|t| t.trim_start_matches('@'))
    }
}

/// Parameters for `enterCredentials`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Element reference used by the generic steps
///
/// A bare string is CSS, or XPath when it starts with `/` or `(`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorInput {
    Raw(String),
    Typed(Locator),
}

impl SelectorInput {
    pub fn to_locator(&self) -> Locator {
        match self {
            SelectorInput::Raw(s) if s.starts_with('/') || s.starts_with('(') => {
                Locator::xpath(s.as_str())
            }
            SelectorInput::Raw(s) => Locator::css(s.as_str()),
            SelectorInput::Typed(l) => l.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillParams {
    pub selector: SelectorInput,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextParams {
    pub selector: SelectorInput,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCountParams {
    pub card: Card,
    pub count: u64,
}

/// Every step a scenario can use
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    // Navigation
    Navigate(String),
    OpenLoginPage,
    /// Open the login page and sign in with the configured account
    LoginWithValidCredentials,

    // Login form
    EnterValidCredentials,
    EnterInvalidCredentials,
    LeaveCredentialsEmpty,
    EnterCredentials(Credentials),
    ClickLogin,
    AssertDashboard,
    AssertOnLoginPage,
    AssertErrorMessage(String),
    AssertValidationErrors,
    AssertLoginButtonDisabled,

    // Page
    AssertUrlContains(String),
    AssertTitle(String),
    AssertTitleNotEmpty,

    // Search
    OpenSearch,
    EnterSearchTerm(String),
    WaitForDropdown,
    AssertDropdownContains(String),
    AssertDropdownHasResults,
    ClickExactMatch(String),
    ClickPartialMatch(String),
    SearchAndSelect(String),

    // Organization dashboard
    AssertOrganizationLoaded,
    AssertOrganizationName(String),
    AssertBreadcrumb(String),
    AssertTagVisible(Tag),
    AssertTagCount(usize),
    AssertCreatedDateVisible,
    AssertCreatedDate(String),
    AssertUpdatedDateVisible,
    AssertUpdatedDate(String),
    AssertTabVisible(Tab),
    AssertTabActive(Tab),
    AssertTabNotActive(Tab),
    ClickTab(Tab),
    AssertCardVisible(Card),
    AssertCardCount(CardCountParams),
    ClickCard(Card),
    HoverCard(Card),

    // Generic element steps
    Click(SelectorInput),
    Fill(FillParams),
    AssertVisible(SelectorInput),
    AssertText(TextParams),

    // Misc
    Wait(u64),
    TakeScreenshot(Option<String>),
}

impl Step {
    /// Name used in the YAML file
    pub fn keyword(&self) -> &'static str {
        match self {
            Step::Navigate(_) => "navigate",
            Step::OpenLoginPage => "openLoginPage",
            Step::LoginWithValidCredentials => "loginWithValidCredentials",
            Step::EnterValidCredentials => "enterValidCredentials",
            Step::EnterInvalidCredentials => "enterInvalidCredentials",
            Step::LeaveCredentialsEmpty => "leaveCredentialsEmpty",
            Step::EnterCredentials(_) => "enterCredentials",
            Step::ClickLogin => "clickLogin",
            Step::AssertDashboard => "assertDashboard",
            Step::AssertOnLoginPage => "assertOnLoginPage",
            Step::AssertErrorMessage(_) => "assertErrorMessage",
            Step::AssertValidationErrors => "assertValidationErrors",
            Step::AssertLoginButtonDisabled => "assertLoginButtonDisabled",
            Step::AssertUrlContains(_) => "assertUrlContains",
            Step::AssertTitle(_) => "assertTitle",
            Step::AssertTitleNotEmpty => "assertTitleNotEmpty",
            Step::OpenSearch => "openSearch",
            Step::EnterSearchTerm(_) => "enterSearchTerm",
            Step::WaitForDropdown => "waitForDropdown",
            Step::AssertDropdownContains(_) => "assertDropdownContains",
            Step::AssertDropdownHasResults => "assertDropdownHasResults",
            Step::ClickExactMatch(_) => "clickExactMatch",
            Step::ClickPartialMatch(_) => "clickPartialMatch",
            Step::SearchAndSelect(_) => "searchAndSelect",
            Step::AssertOrganizationLoaded => "assertOrganizationLoaded",
            Step::AssertOrganizationName(_) => "assertOrganizationName",
            Step::AssertBreadcrumb(_) => "assertBreadcrumb",
            Step::AssertTagVisible(_) => "assertTagVisible",
            Step::AssertTagCount(_) => "assertTagCount",
            Step::AssertCreatedDateVisible => "assertCreatedDateVisible",
            Step::AssertCreatedDate(_) => "assertCreatedDate",
            Step::AssertUpdatedDateVisible => "assertUpdatedDateVisible",
            Step::AssertUpdatedDate(_) => "assertUpdatedDate",
            Step::AssertTabVisible(_) => "assertTabVisible",
            Step::AssertTabActive(_) => "assertTabActive",
            Step::AssertTabNotActive(_) => "assertTabNotActive",
            Step::ClickTab(_) => "clickTab",
            Step::AssertCardVisible(_) => "assertCardVisible",
            Step::AssertCardCount(_) => "assertCardCount",
            Step::ClickCard(_) => "clickCard",
            Step::HoverCard(_) => "hoverCard",
            Step::Click(_) => "click",
            Step::Fill(_) => "fill",
            Step::AssertVisible(_) => "assertVisible",
            Step::AssertText(_) => "assertText",
            Step::Wait(_) => "wait",
            Step::TakeScreenshot(_) => "takeScreenshot",
        }
    }
}

/// Human readable step line for reports and console output
impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate(url) => write!(f, "Navigate to {}", url),
            Step::OpenLoginPage => write!(f, "Open the login page"),
            Step::LoginWithValidCredentials => write!(f, "Log in with valid credentials"),
            Step::EnterValidCredentials => write!(f, "Enter valid username and password"),
            Step::EnterInvalidCredentials => write!(f, "Enter invalid username and password"),
            Step::LeaveCredentialsEmpty => write!(f, "Leave username and password empty"),
            Step::EnterCredentials(c) => write!(f, "Enter \"{}\" and \"***\"", c.username),
            Step::ClickLogin => write!(f, "Click the login button"),
            Step::AssertDashboard => write!(f, "Should be redirected to the dashboard"),
            Step::AssertOnLoginPage => write!(f, "Should remain on the login page"),
            Step::AssertErrorMessage(m) => write!(f, "Should see error message \"{}\"", m),
            Step::AssertValidationErrors => write!(f, "Should see validation errors"),
            Step::AssertLoginButtonDisabled => write!(f, "Login button should be disabled"),
            Step::AssertUrlContains(s) => write!(f, "URL should contain \"{}\"", s),
            Step::AssertTitle(s) => write!(f, "Page title should be \"{}\"", s),
            Step::AssertTitleNotEmpty => write!(f, "Page title should not be empty"),
            Step::OpenSearch => write!(f, "Click the search button in the navbar"),
            Step::EnterSearchTerm(s) => write!(f, "Enter \"{}\" in the search input", s),
            Step::WaitForDropdown => write!(f, "Wait for the dropdown"),
            Step::AssertDropdownContains(s) => write!(f, "Dropdown should contain \"{}\"", s),
            Step::AssertDropdownHasResults => write!(f, "Dropdown should display results"),
            Step::ClickExactMatch(s) => write!(f, "Click the exact match \"{}\"", s),
            Step::ClickPartialMatch(s) => write!(f, "Click the option matching \"{}\"", s),
            Step::SearchAndSelect(s) => write!(f, "Search for \"{}\" and open it", s),
            Step::AssertOrganizationLoaded => write!(f, "Organization page should be loaded"),
            Step::AssertOrganizationName(s) => write!(f, "Organization name \"{}\" should be visible", s),
            Step::AssertBreadcrumb(s) => write!(f, "Breadcrumb should show \"{}\"", s),
            Step::AssertTagVisible(t) => write!(f, "\"{}\" tag should be visible", t),
            Step::AssertTagCount(n) => write!(f, "Exactly {} tags should be displayed", n),
            Step::AssertCreatedDateVisible => write!(f, "Created date should be visible"),
            Step::AssertCreatedDate(s) => write!(f, "Created date should contain \"{}\"", s),
            Step::AssertUpdatedDateVisible => write!(f, "Updated date should be visible"),
            Step::AssertUpdatedDate(s) => write!(f, "Updated date should contain \"{}\"", s),
            Step::AssertTabVisible(t) => write!(f, "\"{}\" tab should be visible", t),
            Step::AssertTabActive(t) => write!(f, "\"{}\" tab should be active", t),
            Step::AssertTabNotActive(t) => write!(f, "\"{}\" tab should not be active", t),
            Step::ClickTab(t) => write!(f, "Click the \"{}\" tab", t),
            Step::AssertCardVisible(c) => write!(f, "\"{}\" card should be visible", c),
            Step::AssertCardCount(p) => write!(f, "{} count should be {}", p.card, p.count),
            Step::ClickCard(c) => write!(f, "Click the {} card", c),
            Step::HoverCard(c) => write!(f, "Hover over the {} card", c),
            Step::Click(s) => write!(f, "Click {}", s.to_locator()),
            Step::Fill(p) => write!(f, "Enter \"{}\" into {}", p.text, p.selector.to_locator()),
            Step::AssertVisible(s) => write!(f, "{} should be visible", s.to_locator()),
            Step::AssertText(p) => write!(
                f,
                "{} should contain text \"{}\"",
                p.selector.to_locator(),
                p.text
            ),
            Step::Wait(secs) => write!(f, "Wait {} seconds", secs),
            Step::TakeScreenshot(Some(name)) => write!(f, "Take screenshot {}", name),
            Step::TakeScreenshot(None) => write!(f, "Take screenshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_input_detects_xpath() {
        assert_eq!(
            SelectorInput::Raw("//h1".into()).to_locator(),
            Locator::xpath("//h1")
        );
        assert_eq!(
            SelectorInput::Raw("button.primary".into()).to_locator(),
            Locator::css("button.primary")
        );
    }

    #[test]
    fn test_display_hides_password() {
        let step = Step::EnterCredentials(Credentials {
            username: "qa".into(),
            password: "secret".into(),
        });
        assert!(!step.to_string().contains("secret"));
        assert_eq!(step.keyword(), "enterCredentials");
    }

    #[test]
    fn test_effective_tags_strip_at() {
        let feature = FeatureFile {
            tags: vec!["@search".into()],
            ..Default::default()
        };
        let scenario = Scenario {
            tags: vec!["smoke".into()],
            ..Default::default()
        };
        let tags: Vec<&str> = scenario.effective_tags(&feature).collect();
        assert_eq!(tags, vec!["search", "smoke"]);
    }
}
