use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Scenario and step status as written to result records
///
/// Unknown strings are kept verbatim so a record from a newer writer still
/// aggregates; they count towards `total` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
    Broken,
    Other(String),
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ScenarioStatus::Passed => "passed",
            ScenarioStatus::Failed => "failed",
            ScenarioStatus::Skipped => "skipped",
            ScenarioStatus::Broken => "broken",
            ScenarioStatus::Other(s) => s,
        }
    }
}

impl From<String> for ScenarioStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "passed" => ScenarioStatus::Passed,
            "failed" => ScenarioStatus::Failed,
            "skipped" => ScenarioStatus::Skipped,
            "broken" => ScenarioStatus::Broken,
            _ => ScenarioStatus::Other(s),
        }
    }
}

impl From<ScenarioStatus> for String {
    fn from(s: ScenarioStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// One step inside a scenario record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScenarioStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
}

/// One allure-compatible `<uuid>-result.json` record
///
/// Every field is optional on read: records from other writers are
/// aggregated with whatever they carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScenarioStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    /// Milliseconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl ScenarioResult {
    /// Build a record from arbitrary JSON, treating wrong-typed fields as missing
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        let steps = obj
            .get("steps")
            .and_then(Value::as_array)
            .map(|steps| steps.iter().map(StepResult::from_value).collect())
            .unwrap_or_default();

        let labels = obj
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| serde_json::from_value(l.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            uuid: text("uuid"),
            name: text("name"),
            full_name: text("fullName"),
            status: text("status").map(ScenarioStatus::from),
            status_details: obj
                .get("statusDetails")
                .and_then(|d| serde_json::from_value(d.clone()).ok()),
            start: obj.get("start").and_then(as_millis),
            stop: obj.get("stop").and_then(as_millis),
            steps,
            labels,
        })
    }

    /// `stop - start`, zero when either is missing or the span is negative
    pub fn duration(&self) -> Duration {
        span(self.start, self.stop)
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    pub fn message(&self) -> Option<&str> {
        self.status_details.as_ref()?.message.as_deref()
    }
}

impl StepResult {
    fn from_value(value: &Value) -> Self {
        let get = |key: &str| value.get(key);
        Self {
            name: get("name").and_then(Value::as_str).map(str::to_string),
            status: get("status")
                .and_then(Value::as_str)
                .map(|s| ScenarioStatus::from(s.to_string())),
            start: get("start").and_then(as_millis),
            stop: get("stop").and_then(as_millis),
        }
    }
}

fn as_millis(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

fn span(start: Option<i64>, stop: Option<i64>) -> Duration {
    match (start, stop) {
        (Some(start), Some(stop)) => stop
            .checked_sub(start)
            .filter(|d| *d > 0)
            .map_or(Duration::ZERO, |d| Duration::from_millis(d as u64)),
        _ => Duration::ZERO,
    }
}

/// Summary over a set of scenario records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub broken: usize,
    /// Percentage in `[0, 100]`
    pub pass_rate: f64,
    #[serde(serialize_with = "serialize_millis", rename = "totalDurationMs")]
    pub total_duration: Duration,
}

impl RunMetrics {
    /// Records whose status is missing or not one of the four known ones
    pub fn uncounted(&self) -> usize {
        self.total - (self.passed + self.failed + self.skipped + self.broken)
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Failures while reading result records
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("malformed result record {}: {reason}", .path.display())]
    MalformedRecord { path: PathBuf, reason: String },

    #[error("results directory {} is not readable: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no result records found in {}", .path.display())]
    NoResults { path: PathBuf },
}
