use anyhow::Result;
use serde::Serialize;

use super::types::{RunMetrics, ScenarioResult};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    generated_at: &'a str,
    metrics: &'a RunMetrics,
    scenarios: &'a [ScenarioResult],
}

/// Pretty-printed `{generatedAt, metrics, scenarios}` summary
pub fn render_json(
    results: &[ScenarioResult],
    metrics: &RunMetrics,
    generated_at: &str,
) -> Result<String> {
    let report = JsonReport {
        generated_at,
        metrics,
        scenarios: results,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
