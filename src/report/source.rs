//! Reading `<uuid>-result.json` records from a results directory

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::types::{ReportError, ScenarioResult};

pub const RESULT_SUFFIX: &str = "-result.json";

/// Records read from a results directory, plus the ones that were skipped
#[derive(Debug, Default)]
pub struct ResultSet {
    pub results: Vec<ScenarioResult>,
    pub skipped: Vec<ReportError>,
}

/// Read every result record directly inside `dir`
///
/// Unreadable or non-object files become `MalformedRecord` entries in
/// `skipped` and are logged; an empty directory is `NoResults`.
pub fn read_results(dir: &Path) -> Result<ResultSet, ReportError> {
    let meta = std::fs::metadata(dir).map_err(|source| ReportError::SourceUnavailable {
        path: dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ReportError::SourceUnavailable {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        });
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ReportError::SourceUnavailable {
            path: dir.to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk failed")),
        })?;
        let is_record = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .map_or(false, |n| n.ends_with(RESULT_SUFFIX));
        if is_record {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut set = ResultSet::default();
    for path in files {
        match read_record(&path) {
            Ok(record) => set.results.push(record),
            Err(e) => {
                log::warn!("{}", e);
                set.skipped.push(e);
            }
        }
    }

    if set.results.is_empty() {
        return Err(ReportError::NoResults {
            path: dir.to_path_buf(),
        });
    }

    log::debug!(
        "Read {} result records from {} ({} skipped)",
        set.results.len(),
        dir.display(),
        set.skipped.len()
    );
    Ok(set)
}

fn read_record(path: &Path) -> Result<ScenarioResult, ReportError> {
    let malformed = |reason: String| ReportError::MalformedRecord {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
    ScenarioResult::from_value(&value).ok_or_else(|| malformed("not a JSON object".to_string()))
}
