mod driver;

pub use driver::{BrowserType, PlaywrightLauncher, WebDriver, WebDriverConfig};
