//! Page objects for the EM2M web application
//!
//! Each page holds locators and a [`base::BasePage`]; the browser session is
//! borrowed per call.

pub mod base;
pub mod login;
pub mod organization;
pub mod search;

pub use base::BasePage;
pub use login::LoginPage;
pub use organization::{Card, OrganizationPage, Tab, Tag};
pub use search::SearchPage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("unknown {kind} '{name}' (expected one of: {})", expected.join(", "))]
    Unknown {
        kind: &'static str,
        name: String,
        expected: Vec<String>,
    },
}
