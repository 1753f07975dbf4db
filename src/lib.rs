pub mod driver;
pub mod pages;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use driver::poll::{poll, CancelFlag, PollConfig, PollError};
pub use report::{compute_metrics, generate_report, render_report};
pub use runner::run_scenarios;
