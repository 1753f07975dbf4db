use chrono::Utc;
use uuid::Uuid;

use crate::report::{Label, ScenarioResult, ScenarioStatus, StatusDetails, StepResult};

/// Step execution status
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed { error: String },
    Broken { error: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending | StepStatus::Running)
    }

    fn record_status(&self) -> ScenarioStatus {
        match self {
            StepStatus::Passed => ScenarioStatus::Passed,
            StepStatus::Failed { .. } => ScenarioStatus::Failed,
            StepStatus::Broken { .. } => ScenarioStatus::Broken,
            StepStatus::Pending | StepStatus::Running | StepStatus::Skipped { .. } => {
                ScenarioStatus::Skipped
            }
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// State for a single step
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub display: String,
    pub status: StepStatus,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl StepState {
    pub fn new(index: usize, display: &str) -> Self {
        Self {
            index,
            display: display.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(now_millis());
    }

    pub fn pass(&mut self) {
        self.finish(StepStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    pub fn broken(&mut self, error: String) {
        self.finish(StepStatus::Broken { error });
    }

    pub fn skip(&mut self, reason: &str) {
        self.status = StepStatus::Skipped {
            reason: reason.to_string(),
        };
    }

    pub fn duration_ms(&self) -> Option<i64> {
        Some(self.finished_at? - self.started_at?)
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.finished_at = Some(now_millis());
    }

    fn to_result(&self) -> StepResult {
        StepResult {
            name: Some(self.display.clone()),
            status: Some(self.status.record_status()),
            start: self.started_at,
            stop: self.finished_at,
        }
    }
}

/// State for one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub uuid: String,
    pub name: String,
    pub feature: String,
    pub tags: Vec<String>,
    pub steps: Vec<StepState>,
    pub current_index: usize,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub screenshot: Option<String>,
    /// Set when no session could be opened; the scenario is broken even with no steps
    pub launch_error: Option<String>,
}

impl ScenarioState {
    pub fn new(name: &str, feature: &str, tags: Vec<String>, steps: Vec<StepState>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: name.to_string(),
            feature: feature.to_string(),
            tags,
            steps,
            current_index: 0,
            started_at: None,
            finished_at: None,
            screenshot: None,
            launch_error: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(now_millis());
    }

    /// Record that the browser never started and skip every step
    pub fn launch_failed(&mut self, error: String, reason: &str) {
        self.launch_error = Some(error);
        self.current_index = 0;
        self.skip_remaining(reason);
    }

    pub fn advance(&mut self) -> bool {
        self.current_index += 1;
        self.current_index < self.steps.len()
    }

    pub fn skip_remaining(&mut self, reason: &str) {
        let start = self.current_index.min(self.steps.len());
        for step in &mut self.steps[start..] {
            if !step.status.is_terminal() {
                step.skip(reason);
            }
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(now_millis());
    }

    /// First failing step decides the scenario status
    pub fn status(&self) -> ScenarioStatus {
        if self.launch_error.is_some() {
            return ScenarioStatus::Broken;
        }
        self.steps
            .iter()
            .find_map(|s| match s.status {
                StepStatus::Failed { .. } => Some(ScenarioStatus::Failed),
                StepStatus::Broken { .. } => Some(ScenarioStatus::Broken),
                _ => None,
            })
            .unwrap_or(ScenarioStatus::Passed)
    }

    pub fn error(&self) -> Option<&str> {
        if let Some(error) = &self.launch_error {
            return Some(error.as_str());
        }
        self.steps.iter().find_map(|s| match &s.status {
            StepStatus::Failed { error } | StepStatus::Broken { error } => Some(error.as_str()),
            _ => None,
        })
    }

    pub fn to_result(&self) -> ScenarioResult {
        let mut labels = vec![Label {
            name: "feature".to_string(),
            value: self.feature.clone(),
        }];
        labels.extend(self.tags.iter().map(|t| Label {
            name: "tag".to_string(),
            value: t.clone(),
        }));

        let status_details = self.error().map(|message| StatusDetails {
            message: Some(message.to_string()),
            trace: self
                .screenshot
                .as_ref()
                .map(|path| format!("Screenshot saved: {}", path)),
        });

        ScenarioResult {
            uuid: Some(self.uuid.clone()),
            name: Some(self.name.clone()),
            full_name: Some(format!("{}: {}", self.feature, self.name)),
            status: Some(self.status()),
            status_details,
            start: self.started_at,
            stop: self.finished_at,
            steps: self.steps.iter().map(StepState::to_result).collect(),
            labels,
        }
    }
}
