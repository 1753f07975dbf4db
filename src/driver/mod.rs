pub mod poll;
pub mod traits;
pub mod web;

#[cfg(test)]
pub mod fake;

pub use poll::{CancelFlag, PollConfig, PollError};
pub use traits::{BrowserSession, Locator, SessionLauncher};
