use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::utils::config::Config;

/// Runtime values shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct TestContext {
    /// Directory the result records go to
    pub results_dir: PathBuf,

    /// Directory for the report and failure screenshots
    pub report_dir: PathBuf,

    pub screenshots_dir: PathBuf,

    /// Variables available as `${NAME}` in step parameters
    pub vars: HashMap<String, String>,
}

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("valid regex"))
}

impl TestContext {
    pub fn new(config: &Config) -> Self {
        let mut vars = HashMap::new();
        vars.insert("BASE_URL".to_string(), config.base_url.clone());
        vars.insert("LOGIN_URL".to_string(), config.login_url());
        vars.insert("DASHBOARD_URL".to_string(), config.dashboard_url());
        vars.insert("TEST_USERNAME".to_string(), config.username.clone());
        vars.insert("TEST_PASSWORD".to_string(), config.password.clone());

        Self {
            results_dir: config.results_dir.clone(),
            report_dir: config.report_dir.clone(),
            screenshots_dir: config.screenshots_dir(),
            vars,
        }
    }

    /// Path for a screenshot named after the scenario
    pub fn screenshot_path(&self, scenario: &str, suffix: &str) -> PathBuf {
        self.screenshots_dir
            .join(format!("{}_{}.png", sanitize_file_name(scenario), suffix))
    }

    /// Get a variable from vars, then the process environment
    pub fn get_var(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Replace `${NAME}` patterns; unknown names are kept as written
    pub fn substitute_vars(&self, text: &str) -> String {
        var_pattern()
            .replace_all(text, |caps: &regex::Captures| {
                self.get_var(&caps[1])
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string()
    }
}

/// Keep letters, digits, `-` and `_`; everything else becomes `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
