use anyhow::Result;

use super::base::{BasePage, SHORT_TIMEOUT};
use crate::driver::traits::{BrowserSession, Locator};

/// The `/login` form
#[derive(Debug, Clone)]
pub struct LoginPage {
    base: BasePage,
    login_url: String,
    username_input: Locator,
    password_input: Locator,
    login_button: Locator,
    error_message: Locator,
    validation_error: Locator,
}

impl LoginPage {
    pub fn new(base: BasePage, login_url: impl Into<String>) -> Self {
        Self {
            base,
            login_url: login_url.into(),
            username_input: Locator::name("username"),
            password_input: Locator::name("password"),
            login_button: Locator::css("button.form-login-button"),
            error_message: Locator::css(".error-message, .alert-danger, .mat-error"),
            validation_error: Locator::css(".validation-error, .mat-error"),
        }
    }

    pub fn url(&self) -> &str {
        &self.login_url
    }

    pub async fn open(&self, session: &dyn BrowserSession) -> Result<()> {
        self.base.navigate_to(session, &self.login_url).await
    }

    pub async fn enter_username(&self, session: &dyn BrowserSession, username: &str) -> Result<()> {
        self.base
            .enter_text(session, &self.username_input, username)
            .await
    }

    pub async fn enter_password(&self, session: &dyn BrowserSession, password: &str) -> Result<()> {
        self.base
            .enter_text(session, &self.password_input, password)
            .await
    }

    pub async fn click_login(&self, session: &dyn BrowserSession) -> Result<()> {
        self.base.click(session, &self.login_button).await
    }

    pub async fn login(
        &self,
        session: &dyn BrowserSession,
        username: &str,
        password: &str,
    ) -> Result<()> {
        log::info!("Logging in as {}", username);
        self.enter_username(session, username).await?;
        self.enter_password(session, password).await?;
        self.click_login(session).await
    }

    pub async fn error_message(&self, session: &dyn BrowserSession) -> Result<String> {
        self.base.get_text(session, &self.error_message).await
    }

    pub async fn is_error_displayed(&self, session: &dyn BrowserSession) -> Result<bool> {
        self.base
            .is_visible(session, &self.error_message, None)
            .await
    }

    pub async fn is_validation_error_displayed(&self, session: &dyn BrowserSession) -> Result<bool> {
        self.base
            .is_visible(session, &self.validation_error, Some(SHORT_TIMEOUT))
            .await
    }

    pub async fn is_login_button_enabled(&self, session: &dyn BrowserSession) -> Result<bool> {
        self.base.find(session, &self.login_button).await?;
        session.is_enabled(&self.login_button).await
    }

    /// Still on the login form
    pub async fn is_displayed(&self, session: &dyn BrowserSession) -> Result<bool> {
        Ok(session.current_url().await?.contains("/login")
            && session.is_displayed(&self.username_input).await?)
    }
}
