pub mod context;
pub mod events;
pub mod executor;
pub mod state;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::driver::poll::CancelFlag;
use crate::driver::traits::SessionLauncher;
use crate::parser::types::{FeatureFile, Scenario};
use crate::parser::yaml::parse_feature_file;
use crate::utils::config::Config;

pub use events::{ConsoleEventListener, EventEmitter, RunSummary, TestEvent};
pub use executor::{AssertionFailed, ScenarioExecutor};

/// Feature files under `path`, sorted; a file path is returned as is
pub fn discover_feature_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("Test path not found: {}", path.display());
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    files.sort();
    Ok(files)
}

/// A scenario runs when it carries every required tag, counting feature tags
pub fn matches_tags(feature: &FeatureFile, scenario: &Scenario, required: &[String]) -> bool {
    required.iter().all(|req| {
        let req = req.trim_start_matches('@');
        scenario.effective_tags(feature).any(|tag| tag == req)
    })
}

/// Run every selected scenario under `path`, sequentially
///
/// All files are parsed before the first browser starts, so an unknown step
/// or UI target aborts the run up front. Once `cancel` is set no further
/// scenario starts.
pub async fn run_scenarios(
    path: &Path,
    config: &Config,
    launcher: Arc<dyn SessionLauncher>,
    tags: &[String],
    cancel: CancelFlag,
    emitter: EventEmitter,
) -> Result<RunSummary> {
    let files = discover_feature_files(path)?;
    if files.is_empty() {
        anyhow::bail!("No feature files found in {}", path.display());
    }

    let features = files
        .iter()
        .map(|f| parse_feature_file(f))
        .collect::<Result<Vec<_>>>()?;

    let selected: Vec<(&FeatureFile, Vec<&Scenario>)> = features
        .iter()
        .map(|feature| {
            let scenarios = feature
                .scenarios
                .iter()
                .filter(|s| matches_tags(feature, s, tags))
                .collect();
            (feature, scenarios)
        })
        .collect();
    let total: usize = selected.iter().map(|(_, s)| s.len()).sum();

    let run_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    emitter.emit(TestEvent::RunStarted {
        run_id: run_id.clone(),
        scenario_count: total,
    });
    if total == 0 && !tags.is_empty() {
        log::warn!("No scenario matches tags {:?}", tags);
    }

    let executor = ScenarioExecutor::new(launcher, config, emitter.clone(), cancel.clone());
    let mut summary = RunSummary {
        run_id,
        ..Default::default()
    };

    for (feature, scenarios) in selected {
        if scenarios.is_empty() {
            continue;
        }
        emitter.emit(TestEvent::FeatureStarted {
            name: feature.name.clone(),
            path: feature.path.display().to_string(),
        });

        for scenario in scenarios {
            if cancel.is_cancelled() {
                summary.not_started += 1;
                continue;
            }
            let result = executor.run_scenario(feature, scenario).await?;
            if let Some(status) = &result.status {
                summary.record(status);
            }
        }
    }

    if summary.not_started > 0 {
        log::warn!(
            "Run cancelled, {} scenarios not started",
            summary.not_started
        );
    }
    summary.duration_ms = started.elapsed().as_millis() as u64;
    emitter.emit(TestEvent::RunFinished {
        summary: summary.clone(),
    });

    Ok(summary)
}
