use std::time::Duration;

use super::types::{RunMetrics, ScenarioResult, ScenarioStatus};

/// Reduce scenario records to run metrics
///
/// Order independent. Empty input yields all zeros.
pub fn compute_metrics(results: &[ScenarioResult]) -> RunMetrics {
    let mut metrics = RunMetrics {
        total: results.len(),
        ..Default::default()
    };

    for result in results {
        match result.status {
            Some(ScenarioStatus::Passed) => metrics.passed += 1,
            Some(ScenarioStatus::Failed) => metrics.failed += 1,
            Some(ScenarioStatus::Skipped) => metrics.skipped += 1,
            Some(ScenarioStatus::Broken) => metrics.broken += 1,
            Some(ScenarioStatus::Other(_)) | None => {}
        }
        metrics.total_duration = metrics.total_duration.saturating_add(result.duration());
    }

    if metrics.total > 0 {
        metrics.pass_rate = metrics.passed as f64 / metrics.total as f64 * 100.0;
    }

    metrics
}

/// "42.5s" below a minute, "2m 5.0s" from there on
pub fn format_duration(d: Duration) -> String {
    let seconds = d.as_secs_f64();
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        format!("{}m {:.1}s", minutes as u64, seconds - minutes * 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: &str, start: i64, stop: i64) -> ScenarioResult {
        ScenarioResult {
            name: Some(name.to_string()),
            status: Some(ScenarioStatus::from(status.to_string())),
            start: Some(start),
            stop: Some(stop),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let metrics = compute_metrics(&[]);
        assert_eq!(metrics, RunMetrics::default());
        assert_eq!(metrics.pass_rate, 0.0);
    }

    #[test]
    fn test_counts_and_pass_rate() {
        let mut results = Vec::new();
        for i in 0..7 {
            results.push(record(&format!("p{}", i), "passed", 0, 1000));
        }
        results.push(record("f1", "failed", 0, 1000));
        results.push(record("f2", "failed", 0, 1000));
        results.push(record("s1", "skipped", 0, 0));

        let metrics = compute_metrics(&results);
        assert_eq!(metrics.total, 10);
        assert_eq!(metrics.passed, 7);
        assert_eq!(metrics.failed, 2);
        assert_eq!(metrics.skipped, 1);
        assert_eq!(metrics.broken, 0);
        assert!((metrics.pass_rate - 70.0).abs() < 1e-9);
        assert_eq!(metrics.total_duration, Duration::from_secs(9));
    }

    #[test]
    fn test_order_independent() {
        let results = vec![
            record("a", "passed", 0, 100),
            record("b", "broken", 50, 300),
            record("c", "failed", 10, 20),
        ];
        let mut reversed = results.clone();
        reversed.reverse();
        assert_eq!(compute_metrics(&results), compute_metrics(&reversed));
    }

    #[test]
    fn test_bad_spans_contribute_zero() {
        let mut missing = record("m", "passed", 0, 0);
        missing.stop = None;
        let results = vec![record("neg", "passed", 5000, 1000), missing, record("ok", "passed", 0, 250)];

        let metrics = compute_metrics(&results);
        assert_eq!(metrics.total_duration, Duration::from_millis(250));
    }

    #[test]
    fn test_extreme_spans_do_not_panic() {
        let results = vec![
            record("wide", "passed", i64::MIN, i64::MAX),
            record("max", "passed", 0, i64::MAX),
            record("ok", "passed", 0, 250),
        ];

        let metrics = compute_metrics(&results);
        assert_eq!(metrics.total, 3);
        assert_eq!(
            metrics.total_duration,
            Duration::from_millis(i64::MAX as u64) + Duration::from_millis(250)
        );
    }

    #[test]
    fn test_unknown_status_is_uncounted() {
        let mut no_status = record("n", "passed", 0, 0);
        no_status.status = None;
        let results = vec![record("a", "passed", 0, 0), record("b", "unknown", 0, 0), no_status];

        let metrics = compute_metrics(&results);
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.passed, 1);
        assert_eq!(metrics.uncounted(), 2);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(42_500)), "42.5s");
        assert_eq!(format_duration(Duration::from_millis(125_000)), "2m 5.0s");
        assert_eq!(format_duration(Duration::ZERO), "0.0s");
    }
}
