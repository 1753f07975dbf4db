use super::types::{
    CardCountParams, Credentials, FeatureFile, FillParams, Scenario, SelectorInput, Step,
    TextParams,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

/// Parse a YAML feature file
pub fn parse_feature_file(path: &Path) -> Result<FeatureFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_feature_content(&content, path)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeature {
    #[serde(default, alias = "name")]
    feature: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    background: Vec<Value>,
    #[serde(default)]
    scenarios: Vec<RawScenario>,
}

#[derive(Deserialize)]
struct RawScenario {
    name: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    steps: Vec<Value>,
}

/// Parse YAML content; `path` names the feature when it has no `feature` key
pub fn parse_feature_content(content: &str, path: &Path) -> Result<FeatureFile> {
    let raw: RawFeature = serde_yaml::from_str(content)
        .with_context(|| format!("Failed to parse feature file: {}", path.display()))?;

    let name = raw.feature.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "feature".to_string())
    });

    let background = parse_steps(&raw.background).context("Invalid background step")?;

    let mut scenarios = Vec::with_capacity(raw.scenarios.len());
    for raw_scenario in raw.scenarios {
        let steps = parse_steps(&raw_scenario.steps)
            .with_context(|| format!("Invalid step in scenario '{}'", raw_scenario.name))?;
        scenarios.push(Scenario {
            name: raw_scenario.name,
            tags: raw_scenario.tags,
            steps,
        });
    }

    Ok(FeatureFile {
        name,
        description: raw.description,
        path: path.to_path_buf(),
        tags: raw.tags,
        background,
        scenarios,
    })
}

fn parse_steps(values: &[Value]) -> Result<Vec<Step>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| parse_step_value(v).with_context(|| format!("step #{}", i + 1)))
        .collect()
}

/// Parse a single step from a YAML value
pub fn parse_step_value(value: &Value) -> Result<Step> {
    match value {
        // Step without parameters like "- clickLogin"
        Value::String(s) => parse_simple_step(s)
            .ok_or_else(|| anyhow::anyhow!("Unknown step '{}' (or it needs parameters)", s)),

        // Step with parameters like "- clickTab: Overview"
        Value::Mapping(map) => {
            let mut entries = map.iter();
            let (key, params) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => anyhow::bail!("Invalid step format: expected single key mapping"),
            };
            let name = key
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Step name must be a string"))?;

            if params.is_null() {
                if let Some(step) = parse_simple_step(name) {
                    return Ok(step);
                }
            }

            parse_step_with_params(name, params)
                .with_context(|| format!("Invalid parameters for '{}'", name))
        }

        _ => anyhow::bail!("Invalid step format: {:?}", value),
    }
}

fn parse_simple_step(name: &str) -> Option<Step> {
    let step = match name {
        "openLoginPage" => Step::OpenLoginPage,
        "loginWithValidCredentials" | "login" => Step::LoginWithValidCredentials,
        "enterValidCredentials" => Step::EnterValidCredentials,
        "enterInvalidCredentials" => Step::EnterInvalidCredentials,
        "leaveCredentialsEmpty" => Step::LeaveCredentialsEmpty,
        "clickLogin" => Step::ClickLogin,
        "assertDashboard" => Step::AssertDashboard,
        "assertOnLoginPage" => Step::AssertOnLoginPage,
        "assertValidationErrors" => Step::AssertValidationErrors,
        "assertLoginButtonDisabled" => Step::AssertLoginButtonDisabled,
        "assertTitleNotEmpty" => Step::AssertTitleNotEmpty,
        "openSearch" => Step::OpenSearch,
        "waitForDropdown" => Step::WaitForDropdown,
        "assertDropdownHasResults" => Step::AssertDropdownHasResults,
        "assertOrganizationLoaded" => Step::AssertOrganizationLoaded,
        "assertCreatedDateVisible" => Step::AssertCreatedDateVisible,
        "assertUpdatedDateVisible" => Step::AssertUpdatedDateVisible,
        "takeScreenshot" | "screenshot" => Step::TakeScreenshot(None),
        _ => return None,
    };
    Some(step)
}

fn parse_step_with_params(name: &str, params: &Value) -> Result<Step> {
    fn arg<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T> {
        Ok(serde_yaml::from_value(params.clone())?)
    }

    let step = match name {
        "navigate" | "open" => Step::Navigate(string_param(params)?),
        "enterCredentials" => Step::EnterCredentials(arg::<Credentials>(params)?),
        "assertErrorMessage" => Step::AssertErrorMessage(string_param(params)?),
        "assertUrlContains" => Step::AssertUrlContains(string_param(params)?),
        "assertTitle" => Step::AssertTitle(string_param(params)?),
        "enterSearchTerm" => Step::EnterSearchTerm(string_param(params)?),
        "assertDropdownContains" => Step::AssertDropdownContains(string_param(params)?),
        "clickExactMatch" => Step::ClickExactMatch(string_param(params)?),
        "clickPartialMatch" => Step::ClickPartialMatch(string_param(params)?),
        "searchAndSelect" => Step::SearchAndSelect(string_param(params)?),
        "assertOrganizationName" => Step::AssertOrganizationName(string_param(params)?),
        "assertBreadcrumb" => Step::AssertBreadcrumb(string_param(params)?),
        "assertTagVisible" => Step::AssertTagVisible(arg(params)?),
        "assertTagCount" => Step::AssertTagCount(arg(params)?),
        "assertCreatedDate" => Step::AssertCreatedDate(string_param(params)?),
        "assertUpdatedDate" => Step::AssertUpdatedDate(string_param(params)?),
        "assertTabVisible" => Step::AssertTabVisible(arg(params)?),
        "assertTabActive" => Step::AssertTabActive(arg(params)?),
        "assertTabNotActive" => Step::AssertTabNotActive(arg(params)?),
        "clickTab" => Step::ClickTab(arg(params)?),
        "assertCardVisible" => Step::AssertCardVisible(arg(params)?),
        "assertCardCount" => Step::AssertCardCount(arg::<CardCountParams>(params)?),
        "clickCard" => Step::ClickCard(arg(params)?),
        "hoverCard" => Step::HoverCard(arg(params)?),
        "click" => Step::Click(arg::<SelectorInput>(params)?),
        "fill" => Step::Fill(arg::<FillParams>(params)?),
        "assertVisible" => Step::AssertVisible(arg::<SelectorInput>(params)?),
        "assertText" => Step::AssertText(arg::<TextParams>(params)?),
        "wait" => Step::Wait(arg(params)?),
        "takeScreenshot" | "screenshot" => Step::TakeScreenshot(Some(string_param(params)?)),
        _ => anyhow::bail!("Unknown step '{}'", name),
    };

    Ok(step)
}

/// Scalar parameter as text; numbers and booleans are accepted verbatim
fn string_param(params: &Value) -> Result<String> {
    match params {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => anyhow::bail!("expected a string, got {:?}", params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::Locator;
    use crate::pages::{Card, Tab, Tag};

    #[test]
    fn test_parse_feature() {
        let yaml = r#"
feature: ASEED organization page
tags: [organization]
background:
  - loginWithValidCredentials
  - searchAndSelect: ASEED
scenarios:
  - name: Tabs are shown
    tags: [smoke]
    steps:
      - assertOrganizationLoaded
      - assertTabVisible: overview
      - clickTab: Payment Assurance
      - assertTabActive: PAYMENT ASSURANCE
  - name: Vehicles card
    steps:
      - assertCardCount:
          card: Vehicles
          count: 12
      - assertTagVisible: Dealer
      - assertTagCount: 3
"#;

        let feature = parse_feature_content(yaml, Path::new("organization.yaml")).unwrap();
        assert_eq!(feature.name, "ASEED organization page");
        assert_eq!(feature.background.len(), 2);
        assert_eq!(feature.background[1], Step::SearchAndSelect("ASEED".into()));
        assert_eq!(feature.scenarios.len(), 2);
        assert_eq!(feature.scenarios[0].steps[1], Step::AssertTabVisible(Tab::Overview));
        assert_eq!(feature.scenarios[0].steps[2], Step::ClickTab(Tab::PaymentAssurance));
        assert_eq!(
            feature.scenarios[1].steps[0],
            Step::AssertCardCount(CardCountParams {
                card: Card::Vehicles,
                count: 12
            })
        );
        assert_eq!(feature.scenarios[1].steps[1], Step::AssertTagVisible(Tag::Dealer));
        assert_eq!(feature.scenarios[1].steps[2], Step::AssertTagCount(3));
    }

    #[test]
    fn test_feature_name_defaults_to_file_stem() {
        let feature =
            parse_feature_content("scenarios: []", Path::new("features/login.yaml")).unwrap();
        assert_eq!(feature.name, "login");
    }

    #[test]
    fn test_unknown_card_fails_at_parse_time() {
        let yaml = r#"
scenarios:
  - name: Broken
    steps:
      - clickCard: Invoices
"#;
        let err = parse_feature_content(yaml, Path::new("x.yaml")).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Broken"), "{}", chain);
        assert!(chain.contains("clickCard"), "{}", chain);
    }

    #[test]
    fn test_unknown_step_is_an_error() {
        let err = parse_step_value(&Value::String("dance".into())).unwrap_err();
        assert!(err.to_string().contains("dance"));
    }

    #[test]
    fn test_generic_selector_steps() {
        let click: Value = serde_yaml::from_str("click: '#submit'").unwrap();
        assert_eq!(
            parse_step_value(&click).unwrap(),
            Step::Click(SelectorInput::Raw("#submit".into()))
        );

        let fill: Value = serde_yaml::from_str(
            "fill:\n  selector: {kind: name, value: email}\n  text: qa@em2m.net",
        )
        .unwrap();
        match parse_step_value(&fill).unwrap() {
            Step::Fill(p) => {
                assert_eq!(p.selector.to_locator(), Locator::name("email"));
                assert_eq!(p.text, "qa@em2m.net");
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_simple_step_accepts_null_mapping() {
        let v: Value = serde_yaml::from_str("clickLogin:").unwrap();
        assert_eq!(parse_step_value(&v).unwrap(), Step::ClickLogin);
    }

    #[test]
    fn test_shipped_features_parse() {
        for (name, content) in [
            ("login.yaml", include_str!("../../features/login.yaml")),
            ("search.yaml", include_str!("../../features/search.yaml")),
            ("organization.yaml", include_str!("../../features/organization.yaml")),
        ] {
            let feature = parse_feature_content(content, Path::new(name))
                .unwrap_or_else(|e| panic!("{}: {:#}", name, e));
            assert!(!feature.scenarios.is_empty(), "{}", name);
        }
    }

    #[test]
    fn test_numeric_string_param() {
        let v: Value = serde_yaml::from_str("assertCreatedDate: 2024").unwrap();
        assert_eq!(
            parse_step_value(&v).unwrap(),
            Step::AssertCreatedDate("2024".into())
        );
    }
}
