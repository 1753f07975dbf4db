pub mod html;
pub mod json;
pub mod junit;
pub mod metrics;
pub mod source;
pub mod types;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use html::{render_report, ReportOptions};
pub use metrics::{compute_metrics, format_duration};
pub use source::{read_results, ResultSet};
pub use types::{
    Label, ReportError, RunMetrics, ScenarioResult, ScenarioStatus, StatusDetails, StepResult,
};

/// Output formats of the report generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
    Junit,
}

impl ReportFormat {
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ReportFormat::Html => "test_report.html",
            ReportFormat::Json => "test_report.json",
            ReportFormat::Junit => "junit.xml",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            "junit" | "xml" => Ok(ReportFormat::Junit),
            _ => anyhow::bail!("Unknown format: {} (expected html, json or junit)", s),
        }
    }
}

/// What a report run produced
#[derive(Debug)]
pub struct ReportSummary {
    pub output: PathBuf,
    pub metrics: RunMetrics,
    pub skipped_records: usize,
}

/// Read the records in `results_dir`, aggregate them and write one report
///
/// Source errors come back as [`ReportError`] inside the `anyhow::Error` so
/// callers can downcast and print guidance.
pub fn generate_report(
    results_dir: &Path,
    format: ReportFormat,
    output: &Path,
    options: &ReportOptions,
) -> Result<ReportSummary> {
    let ResultSet { results, skipped } = read_results(results_dir)?;
    let metrics = compute_metrics(&results);
    let generated_at = chrono::Local::now().format("%B %d, %Y at %I:%M %p").to_string();

    let content = match format {
        ReportFormat::Html => render_report(&results, &metrics, options, &generated_at),
        ReportFormat::Json => json::render_json(&results, &metrics, &generated_at)?,
        ReportFormat::Junit => {
            let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
            junit::render_junit(&results, &metrics, &options.title, &timestamp)?
        }
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, content)?;
    log::info!("Report written to {}", output.display());

    Ok(ReportSummary {
        output: output.to_path_buf(),
        metrics,
        skipped_records: skipped.len(),
    })
}
