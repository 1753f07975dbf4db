use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::context::{sanitize_file_name, TestContext};
use super::events::{EventEmitter, TestEvent};
use super::state::{ScenarioState, StepState};
use crate::driver::poll::{self, CancelFlag, PollError};
use crate::driver::traits::{BrowserSession, SessionLauncher};
use crate::pages::{BasePage, LoginPage, OrganizationPage, SearchPage};
use crate::parser::types::{FeatureFile, Scenario, Step};
use crate::report::source::RESULT_SUFFIX;
use crate::report::{ScenarioResult, ScenarioStatus};
use crate::utils::config::Config;

/// A check that did not hold; the scenario is recorded as `failed`
///
/// Any other step error records the scenario as `broken`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AssertionFailed(pub String);

fn check(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(AssertionFailed(message()).into())
    }
}

fn is_assertion(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<AssertionFailed>())
}

/// Seconds allowed for the redirect after submitting the login form
const LOGIN_REDIRECT_TIMEOUT: Duration = Duration::from_secs(20);
const DASHBOARD_TIMEOUT: Duration = Duration::from_secs(15);

const INVALID_USERNAME: &str = "invalid@em2m.net";
const INVALID_PASSWORD: &str = "wrongpassword";

/// Runs scenarios, one fresh browser session each
pub struct ScenarioExecutor {
    launcher: Arc<dyn SessionLauncher>,
    context: TestContext,
    emitter: EventEmitter,
    cancel: CancelFlag,
    base: BasePage,
    login: LoginPage,
    search: SearchPage,
    organization: OrganizationPage,
    base_url: String,
    username: String,
    password: String,
}

impl ScenarioExecutor {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        config: &Config,
        emitter: EventEmitter,
        cancel: CancelFlag,
    ) -> Self {
        let base = BasePage::from_config(config, &cancel);
        Self {
            launcher,
            context: TestContext::new(config),
            emitter,
            cancel,
            login: LoginPage::new(base.clone(), config.login_url()),
            search: SearchPage::new(base.clone()),
            organization: OrganizationPage::new(base.clone()),
            base,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    /// Run background and scenario steps, then write the result record
    pub async fn run_scenario(
        &self,
        feature: &FeatureFile,
        scenario: &Scenario,
    ) -> Result<ScenarioResult> {
        let steps: Vec<&Step> = feature
            .background
            .iter()
            .chain(scenario.steps.iter())
            .collect();

        let step_states = steps
            .iter()
            .enumerate()
            .map(|(i, step)| StepState::new(i, &self.context.substitute_vars(&step.to_string())))
            .collect();
        let tags = scenario
            .effective_tags(feature)
            .map(str::to_string)
            .collect();
        let mut state = ScenarioState::new(&scenario.name, &feature.name, tags, step_states);

        self.emitter.emit(TestEvent::ScenarioStarted {
            name: scenario.name.clone(),
            step_count: steps.len(),
        });
        log::info!("Starting scenario: {}", scenario.name);
        state.start();

        match self.launcher.launch().await {
            Ok(session) => {
                self.run_steps(session.as_ref(), &steps, &mut state).await;
                if let Err(e) = session.close().await {
                    log::warn!("Failed to close browser session: {:#}", e);
                }
            }
            Err(e) => {
                let message = format!("Failed to launch browser: {:#}", e);
                log::error!("{}", message);
                state.launch_failed(message, "browser did not start");
                self.emit_skipped(&state, "browser did not start");
            }
        }

        state.finish();
        let result = state.to_result();
        let record = self.write_record(&result)?;
        log::debug!("Result record written to {}", record.display());

        let status = result.status.clone().unwrap_or(ScenarioStatus::Broken);
        log::info!("Scenario '{}' completed with status: {}", scenario.name, status);
        self.emitter.emit(TestEvent::ScenarioFinished {
            name: scenario.name.clone(),
            status,
            duration_ms: result.duration().as_millis() as u64,
            screenshot: state.screenshot.clone(),
        });

        Ok(result)
    }

    async fn run_steps(
        &self,
        session: &dyn BrowserSession,
        steps: &[&Step],
        state: &mut ScenarioState,
    ) {
        state.current_index = 0;
        for (i, step) in steps.iter().enumerate() {
            let display = state.steps[i].display.clone();
            self.emitter.emit(TestEvent::StepStarted {
                index: i,
                step: display,
            });
            state.steps[i].start();

            let outcome = if self.cancel.is_cancelled() {
                Err(anyhow::anyhow!("Run cancelled"))
            } else {
                self.execute_step(session, step, &state.name, i).await
            };

            match outcome {
                Ok(()) => {
                    state.steps[i].pass();
                    self.emitter.emit(TestEvent::StepPassed {
                        index: i,
                        duration_ms: step_duration(&state.steps[i]),
                    });
                    state.advance();
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    if is_assertion(&e) {
                        state.steps[i].fail(message.clone());
                    } else {
                        state.steps[i].broken(message.clone());
                    }
                    self.emitter.emit(TestEvent::StepFailed {
                        index: i,
                        error: message,
                        duration_ms: step_duration(&state.steps[i]),
                    });

                    state.screenshot = self.capture_failure(session, &state.name, i).await;
                    state.advance();
                    state.skip_remaining("previous step failed");
                    self.emit_skipped(state, "previous step failed");
                    return;
                }
            }
        }
    }

    fn emit_skipped(&self, state: &ScenarioState, reason: &str) {
        for step in state.steps.iter().skip(state.current_index) {
            self.emitter.emit(TestEvent::StepSkipped {
                index: step.index,
                step: step.display.clone(),
                reason: reason.to_string(),
            });
        }
    }

    /// Best effort: a failed capture is logged, never fatal
    async fn capture_failure(
        &self,
        session: &dyn BrowserSession,
        scenario: &str,
        index: usize,
    ) -> Option<String> {
        let path = self.context.screenshot_path(scenario, &index.to_string());
        if let Err(e) = std::fs::create_dir_all(&self.context.screenshots_dir) {
            log::warn!(
                "Failed to create {}: {}",
                self.context.screenshots_dir.display(),
                e
            );
            return None;
        }
        match session.screenshot(&path).await {
            Ok(()) => {
                log::info!("Screenshot saved: {}", path.display());
                Some(path.display().to_string())
            }
            Err(e) => {
                log::warn!("Failed to take screenshot: {:#}", e);
                None
            }
        }
    }

    fn write_record(&self, result: &ScenarioResult) -> Result<PathBuf> {
        let dir = &self.context.results_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create results directory {}", dir.display()))?;

        let uuid = result.uuid.as_deref().unwrap_or("unknown");
        let path = dir.join(format!("{}{}", uuid, RESULT_SUFFIX));
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write result record {}", path.display()))?;
        Ok(path)
    }

    fn resolve_url(&self, url: &str) -> String {
        let url = self.context.substitute_vars(url);
        if url.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), url)
        } else {
            url
        }
    }

    /// Execute a single step
    pub async fn execute_step(
        &self,
        session: &dyn BrowserSession,
        step: &Step,
        scenario: &str,
        index: usize,
    ) -> Result<()> {
        let sub = |text: &str| self.context.substitute_vars(text);

        match step {
            Step::Navigate(url) => {
                self.base.navigate_to(session, &self.resolve_url(url)).await?;
            }

            Step::OpenLoginPage => self.login.open(session).await?,

            Step::LoginWithValidCredentials => {
                self.login.open(session).await?;
                self.login
                    .login(session, &self.username, &self.password)
                    .await?;
                self.base
                    .wait_for_url_not_contains(session, "/login", Some(LOGIN_REDIRECT_TIMEOUT))
                    .await
                    .context("Login did not leave the login page")?;
                self.base.wait_for_ready(session).await?;
            }

            Step::EnterValidCredentials => {
                self.login.enter_username(session, &self.username).await?;
                self.login.enter_password(session, &self.password).await?;
            }

            Step::EnterInvalidCredentials => {
                self.login.enter_username(session, INVALID_USERNAME).await?;
                self.login.enter_password(session, INVALID_PASSWORD).await?;
            }

            Step::LeaveCredentialsEmpty => {
                self.login.enter_username(session, "").await?;
                self.login.enter_password(session, "").await?;
            }

            Step::EnterCredentials(credentials) => {
                self.login
                    .enter_username(session, &sub(&credentials.username))
                    .await?;
                self.login
                    .enter_password(session, &sub(&credentials.password))
                    .await?;
            }

            Step::ClickLogin => self.login.click_login(session).await?,

            Step::AssertDashboard => {
                let left = self
                    .base
                    .wait_for_url_not_contains(session, "/login", Some(DASHBOARD_TIMEOUT))
                    .await;
                if timed_out(left)? {
                    let url = session.current_url().await?;
                    check(false, || {
                        format!("Still on login page after successful login: {}", url)
                    })?;
                }
            }

            Step::AssertOnLoginPage => {
                let url = session.current_url().await?;
                check(url.contains("/login"), || {
                    format!("Expected to remain on login page, but current URL is {}", url)
                })?;
            }

            Step::AssertErrorMessage(expected) => {
                let expected = sub(expected);
                check(self.login.is_error_displayed(session).await?, || {
                    "Could not find error message element".to_string()
                })?;
                let actual = self.login.error_message(session).await?;
                check(actual.to_lowercase().contains(&expected.to_lowercase()), || {
                    format!("Expected error message '{}', but got '{}'", expected, actual)
                })?;
            }

            Step::AssertValidationErrors => {
                check(self.login.is_validation_error_displayed(session).await?, || {
                    "No validation errors displayed".to_string()
                })?;
            }

            Step::AssertLoginButtonDisabled => {
                check(!self.login.is_login_button_enabled(session).await?, || {
                    "Login button is enabled".to_string()
                })?;
            }

            Step::AssertUrlContains(fragment) => {
                let fragment = sub(fragment);
                let reached = self.base.wait_for_url_contains(session, &fragment, None).await;
                if timed_out(reached)? {
                    let url = session.current_url().await?;
                    check(false, || {
                        format!("Expected URL to contain '{}', but got '{}'", fragment, url)
                    })?;
                }
            }

            Step::AssertTitle(expected) => {
                let expected = sub(expected);
                let wanted = expected.as_str();
                let matched = poll::holds_within(self.base.poll(), || async move {
                    session.title().await.map(|t| t == wanted)
                })
                .await?;
                if !matched {
                    let actual = session.title().await?;
                    check(false, || {
                        format!("Expected title '{}', but got '{}'", expected, actual)
                    })?;
                }
            }

            Step::AssertTitleNotEmpty => {
                let title = session.title().await?;
                check(!title.trim().is_empty(), || "Page title is empty".to_string())?;
            }

            Step::OpenSearch => self.search.open_search(session).await?,

            Step::EnterSearchTerm(term) => {
                self.search.enter_search_term(session, &sub(term)).await?;
            }

            Step::WaitForDropdown => {
                if !self.search.wait_for_dropdown(session).await? {
                    self.emitter.emit(TestEvent::Log {
                        message: "Dropdown did not appear, continuing".to_string(),
                    });
                }
            }

            Step::AssertDropdownContains(text) => {
                let text = sub(text);
                check(self.search.is_text_in_dropdown(session, &text).await?, || {
                    format!("Text '{}' not found in dropdown options", text)
                })?;
            }

            Step::AssertDropdownHasResults => {
                check(self.search.is_dropdown_visible(session).await?, || {
                    "Search dropdown is not visible".to_string()
                })?;
                let options = self.search.option_texts(session).await?;
                check(!options.is_empty(), || "No results found in dropdown".to_string())?;
            }

            Step::ClickExactMatch(text) => {
                self.search.click_exact_match(session, &sub(text)).await?;
            }

            Step::ClickPartialMatch(text) => {
                self.search.click_partial_match(session, &sub(text)).await?;
            }

            Step::SearchAndSelect(term) => {
                self.search.search_and_select(session, &sub(term)).await?;
            }

            Step::AssertOrganizationLoaded => {
                check(self.organization.is_loaded(session).await?, || {
                    "Organization page did not load".to_string()
                })?;
            }

            Step::AssertOrganizationName(name) => {
                let name = sub(name);
                let found = self.organization.organization_name(session, &name).await?;
                check(found.is_some(), || {
                    format!("Organization name '{}' not visible", name)
                })?;
            }

            Step::AssertBreadcrumb(text) => {
                let text = sub(text);
                let breadcrumb = self.organization.breadcrumb(session).await?;
                check(
                    breadcrumb.as_deref().map_or(false, |b| b.contains(&text)),
                    || format!("Breadcrumb {:?} does not show '{}'", breadcrumb, text),
                )?;
            }

            Step::AssertTagVisible(tag) => {
                check(self.organization.is_tag_visible(session, *tag).await?, || {
                    format!("'{}' tag not visible", tag)
                })?;
            }

            Step::AssertTagCount(expected) => {
                let tags = self.organization.visible_tags(session).await?;
                check(tags.len() == *expected, || {
                    format!("Expected {} tags, found {}: {:?}", expected, tags.len(), tags)
                })?;
            }

            Step::AssertCreatedDateVisible => {
                let date = self.organization.created_date(session).await?;
                check(date.is_some(), || "Created date not visible".to_string())?;
            }

            Step::AssertCreatedDate(text) => {
                let text = sub(text);
                let date = self.organization.created_date(session).await?;
                check(date.as_deref().map_or(false, |d| d.contains(&text)), || {
                    format!("Created date {:?} does not contain '{}'", date, text)
                })?;
            }

            Step::AssertUpdatedDateVisible => {
                let date = self.organization.updated_date(session).await?;
                check(date.is_some(), || "Updated date not visible".to_string())?;
            }

            Step::AssertUpdatedDate(text) => {
                let text = sub(text);
                let date = self.organization.updated_date(session).await?;
                check(date.as_deref().map_or(false, |d| d.contains(&text)), || {
                    format!("Updated date {:?} does not contain '{}'", date, text)
                })?;
            }

            Step::AssertTabVisible(tab) => {
                check(self.organization.is_tab_visible(session, *tab).await?, || {
                    format!("'{}' tab not visible", tab)
                })?;
            }

            Step::AssertTabActive(tab) => {
                check(self.organization.is_tab_active(session, *tab).await?, || {
                    format!("'{}' tab is not active", tab)
                })?;
            }

            Step::AssertTabNotActive(tab) => {
                check(!self.organization.is_tab_active(session, *tab).await?, || {
                    format!("'{}' tab is active", tab)
                })?;
            }

            Step::ClickTab(tab) => self.organization.click_tab(session, *tab).await?,

            Step::AssertCardVisible(card) => {
                check(self.organization.is_card_visible(session, *card).await?, || {
                    format!("'{}' card not visible", card)
                })?;
            }

            Step::AssertCardCount(params) => {
                let count = self.organization.card_count(session, params.card).await?;
                check(count == Some(params.count), || {
                    format!(
                        "Expected {} count {}, found {:?}",
                        params.card, params.count, count
                    )
                })?;
            }

            Step::ClickCard(card) => self.organization.click_card(session, *card).await?,

            Step::HoverCard(card) => self.organization.hover_card(session, *card).await?,

            Step::Click(selector) => {
                self.base.click(session, &selector.to_locator()).await?;
            }

            Step::Fill(params) => {
                self.base
                    .enter_text(session, &params.selector.to_locator(), &sub(&params.text))
                    .await?;
            }

            Step::AssertVisible(selector) => {
                let locator = selector.to_locator();
                check(self.base.is_visible(session, &locator, None).await?, || {
                    format!("Element {} not visible", locator)
                })?;
            }

            Step::AssertText(params) => {
                let locator = params.selector.to_locator();
                let expected = sub(&params.text);
                let actual = self.base.get_text(session, &locator).await?;
                check(actual.contains(&expected), || {
                    format!("Expected text '{}' in {}, got '{}'", expected, locator, actual)
                })?;
            }

            Step::Wait(seconds) => {
                self.base.pause(Duration::from_secs(*seconds)).await?;
            }

            Step::TakeScreenshot(name) => {
                let path = match name {
                    Some(name) => self
                        .context
                        .screenshots_dir
                        .join(format!("{}.png", sanitize_file_name(&sub(name)))),
                    None => self
                        .context
                        .screenshot_path(scenario, &format!("step{}", index)),
                };
                std::fs::create_dir_all(&self.context.screenshots_dir)?;
                session.screenshot(&path).await?;
                self.emitter.emit(TestEvent::Log {
                    message: format!("Screenshot saved: {}", path.display()),
                });
            }
        }

        Ok(())
    }
}

/// `true` on timeout; cancellation is an error, not a negative answer
fn timed_out(outcome: Result<(), PollError>) -> Result<bool> {
    match outcome {
        Ok(()) => Ok(false),
        Err(PollError::Timeout { .. }) => Ok(true),
        Err(e) => Err(e.into()),
    }
}

fn step_duration(step: &StepState) -> u64 {
    step.duration_ms().unwrap_or(0).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeElement, FakeLauncher, FakeSession};
    use crate::driver::traits::Locator;
    use crate::parser::types::SelectorInput;
    use crate::report::{read_results, ScenarioStatus};
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::Path;

    fn config(dir: &Path) -> Config {
        Config {
            base_url: "https://app".to_string(),
            results_dir: dir.join("results"),
            report_dir: dir.join("reports"),
            default_timeout_ms: 1000,
            page_load_timeout_ms: 1000,
            poll_interval_ms: 100,
            ..Config::default()
        }
    }

    fn feature(background: Vec<Step>) -> FeatureFile {
        FeatureFile {
            name: "Authentication".to_string(),
            background,
            ..Default::default()
        }
    }

    fn scenario(name: &str, steps: Vec<Step>) -> Scenario {
        Scenario {
            name: name.to_string(),
            tags: vec!["smoke".to_string()],
            steps,
        }
    }

    fn ready_session() -> FakeSession {
        FakeSession::new()
            .with_url("https://app/login")
            .with_title("EM2M")
            .with_script("readyState", json!("complete"))
    }

    fn executor(launcher: Arc<dyn SessionLauncher>, dir: &Path) -> ScenarioExecutor {
        ScenarioExecutor::new(
            launcher,
            &config(dir),
            EventEmitter::default(),
            CancelFlag::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_passing_scenario_writes_record() {
        let dir = tempfile::tempdir().unwrap();
        let session = ready_session()
            .with_element(Locator::css("#go"), FakeElement::visible("Go"));
        let launcher = Arc::new(FakeLauncher::new(vec![session.clone()]));
        let exec = executor(launcher.clone(), dir.path());

        let result = exec
            .run_scenario(
                &feature(vec![Step::Navigate("${BASE_URL}/login".into())]),
                &scenario(
                    "Open login",
                    vec![
                        Step::AssertUrlContains("/login".into()),
                        Step::Click(SelectorInput::Raw("#go".into())),
                        Step::AssertTitle("EM2M".into()),
                    ],
                ),
            )
            .await
            .unwrap();

        assert_eq!(result.status, Some(ScenarioStatus::Passed));
        assert_eq!(result.steps.len(), 4);
        assert_eq!(
            result.steps[0].name.as_deref(),
            Some("Navigate to https://app/login")
        );
        assert_eq!(result.label("feature"), Some("Authentication"));

        let state = session.state();
        assert_eq!(state.visits, vec!["https://app/login".to_string()]);
        assert!(state.closed);
        assert!(state.screenshots.is_empty());
        drop(state);

        let set = read_results(&dir.path().join("results")).unwrap();
        assert_eq!(set.results.len(), 1);
        assert_eq!(set.results[0].uuid, result.uuid);
        assert_eq!(launcher.launched().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assertion_failure_marks_failed_and_skips_rest() {
        let dir = tempfile::tempdir().unwrap();
        let session = ready_session();
        let exec = executor(Arc::new(FakeLauncher::new(vec![session.clone()])), dir.path());

        let result = exec
            .run_scenario(
                &feature(vec![]),
                &scenario(
                    "Login fails",
                    vec![
                        Step::AssertUrlContains("/dashboard".into()),
                        Step::Click(SelectorInput::Raw("#go".into())),
                    ],
                ),
            )
            .await
            .unwrap();

        assert_eq!(result.status, Some(ScenarioStatus::Failed));
        assert!(result.message().unwrap().contains("/dashboard"));
        assert_eq!(result.steps[1].status, Some(ScenarioStatus::Skipped));

        let state = session.state();
        assert!(state.closed);
        assert_eq!(
            state.screenshots,
            vec![dir.path().join("reports/screenshots/Login_fails_0.png")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_assertion_error_marks_broken() {
        let dir = tempfile::tempdir().unwrap();
        let session = ready_session();
        let exec = executor(Arc::new(FakeLauncher::new(vec![session.clone()])), dir.path());

        let result = exec
            .run_scenario(
                &feature(vec![]),
                &scenario(
                    "Missing button",
                    vec![Step::Click(SelectorInput::Raw("#missing".into()))],
                ),
            )
            .await
            .unwrap();

        assert_eq!(result.status, Some(ScenarioStatus::Broken));
        assert!(result.message().unwrap().contains("not clickable"));
        assert!(session.state().closed);
    }

    struct FailingLauncher;

    #[async_trait]
    impl SessionLauncher for FailingLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
            anyhow::bail!("no browser installed")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(Arc::new(FailingLauncher), dir.path());

        let result = exec
            .run_scenario(
                &feature(vec![]),
                &scenario("No browser", vec![Step::OpenLoginPage, Step::ClickLogin]),
            )
            .await
            .unwrap();

        assert_eq!(result.status, Some(ScenarioStatus::Broken));
        assert!(result.message().unwrap().contains("no browser installed"));
        assert_eq!(result.steps[1].status, Some(ScenarioStatus::Skipped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_without_steps_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(Arc::new(FailingLauncher), dir.path());

        let result = exec
            .run_scenario(&feature(vec![]), &scenario("Empty", vec![]))
            .await
            .unwrap();

        assert_eq!(result.status, Some(ScenarioStatus::Broken));
        assert!(result.message().unwrap().contains("no browser installed"));
        assert!(result.steps.is_empty());
    }

    /// Run one scenario and set the cancel flag `after` into it
    async fn run_cancelled_after(
        dir: &Path,
        steps: Vec<Step>,
        after: Duration,
    ) -> (ScenarioResult, Duration) {
        let cancel = CancelFlag::new();
        let exec = ScenarioExecutor::new(
            Arc::new(FakeLauncher::new(vec![ready_session()])),
            &config(dir),
            EventEmitter::default(),
            cancel.clone(),
        );
        let started = tokio::time::Instant::now();

        let feat = feature(vec![]);
        let scen = scenario("Interrupted", steps);
        let running = exec.run_scenario(&feat, &scen);
        let cancelling = async {
            tokio::time::sleep(after).await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(running, cancelling);
        (result.unwrap(), started.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_visibility_check_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let (result, _) = run_cancelled_after(
            dir.path(),
            vec![Step::AssertVisible(SelectorInput::Raw(".missing".into()))],
            Duration::from_millis(300),
        )
        .await;

        assert_eq!(result.status, Some(ScenarioStatus::Broken));
        assert!(result.message().unwrap().contains("cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_wait_step() {
        let dir = tempfile::tempdir().unwrap();
        let (result, elapsed) = run_cancelled_after(
            dir.path(),
            vec![Step::Wait(600), Step::AssertTitleNotEmpty],
            Duration::from_millis(300),
        )
        .await;

        assert_eq!(result.status, Some(ScenarioStatus::Broken));
        assert_eq!(result.steps[1].status, Some(ScenarioStatus::Skipped));
        assert!(elapsed < Duration::from_secs(1), "waited {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_breaks_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let session = ready_session();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let exec = ScenarioExecutor::new(
            Arc::new(FakeLauncher::new(vec![session.clone()])),
            &config(dir.path()),
            EventEmitter::default(),
            cancel,
        );

        let result = exec
            .run_scenario(
                &feature(vec![]),
                &scenario("Cancelled", vec![Step::AssertTitleNotEmpty]),
            )
            .await
            .unwrap();

        assert_eq!(result.status, Some(ScenarioStatus::Broken));
        assert!(session.state().closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_with_valid_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let session = ready_session()
            .with_element(Locator::name("username"), FakeElement::visible(""))
            .with_element(Locator::name("password"), FakeElement::visible(""))
            .with_element(Locator::css("button.form-login-button"), FakeElement::visible("LOG IN"))
            .navigating_on_click(Locator::css("button.form-login-button"), "https://app/dashboard");
        let exec = executor(Arc::new(FakeLauncher::new(vec![session.clone()])), dir.path());

        let result = exec
            .run_scenario(
                &feature(vec![]),
                &scenario(
                    "Login",
                    vec![Step::LoginWithValidCredentials, Step::AssertDashboard],
                ),
            )
            .await
            .unwrap();

        assert_eq!(result.status, Some(ScenarioStatus::Passed), "{:?}", result.message());
        let state = session.state();
        assert_eq!(state.visits, vec!["https://app/login".to_string()]);
        assert_eq!(state.fills[0].1, Config::default().username);
    }

    #[test]
    fn test_assertion_detected_through_context() {
        let err = anyhow::Error::from(AssertionFailed("nope".into())).context("step #1");
        assert!(is_assertion(&err));
        assert!(!is_assertion(&anyhow::anyhow!("boom")));
    }
}
