use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::types::{RunMetrics, ScenarioResult, ScenarioStatus};

/// Generate JUnit XML: one suite, one test case per scenario
pub fn render_junit(
    results: &[ScenarioResult],
    metrics: &RunMetrics,
    suite_name: &str,
    generated_at: &str,
) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let tests = metrics.total.to_string();
    let failures = metrics.failed.to_string();
    let errors = metrics.broken.to_string();
    let skipped = metrics.skipped.to_string();
    let time = seconds(metrics.total_duration.as_millis() as u64);

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", suite_name));
    suites_start.push_attribute(("tests", tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("errors", errors.as_str()));
    suites_start.push_attribute(("skipped", skipped.as_str()));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", suite_name));
    suite_start.push_attribute(("tests", tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("errors", errors.as_str()));
    suite_start.push_attribute(("skipped", skipped.as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", generated_at));
    writer.write_event(Event::Start(suite_start))?;

    for result in results {
        write_test_case(&mut writer, result)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, result: &ScenarioResult) -> Result<()> {
    let name = result.name.as_deref().unwrap_or("Unknown Test");
    // Feature label groups cases the way JUnit viewers group classes
    let classname = result.label("feature").unwrap_or("em2m");
    let time = seconds(result.duration().as_millis() as u64);

    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", name));
    case_start.push_attribute(("classname", classname));
    case_start.push_attribute(("time", time.as_str()));

    let child = match result.status {
        Some(ScenarioStatus::Failed) => Some(("failure", "AssertionError")),
        Some(ScenarioStatus::Broken) => Some(("error", "Error")),
        Some(ScenarioStatus::Skipped) => Some(("skipped", "")),
        _ => None,
    };

    let Some((tag, kind)) = child else {
        writer.write_event(Event::Empty(case_start))?;
        return Ok(());
    };

    writer.write_event(Event::Start(case_start))?;

    let message = result.message().unwrap_or("");
    let mut child_start = BytesStart::new(tag);
    if tag == "skipped" {
        writer.write_event(Event::Empty(child_start))?;
    } else {
        child_start.push_attribute(("message", message));
        child_start.push_attribute(("type", kind));
        writer.write_event(Event::Start(child_start))?;
        if !message.is_empty() {
            writer.write_event(Event::Text(BytesText::new(message)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

fn seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::metrics::compute_metrics;
    use crate::report::types::{Label, StatusDetails};

    fn record(name: &str, status: ScenarioStatus, message: Option<&str>) -> ScenarioResult {
        ScenarioResult {
            name: Some(name.to_string()),
            status: Some(status),
            status_details: message.map(|m| StatusDetails {
                message: Some(m.to_string()),
                trace: None,
            }),
            start: Some(0),
            stop: Some(1500),
            labels: vec![Label {
                name: "feature".to_string(),
                value: "Login".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_junit_xml() {
        let results = vec![
            record("Valid login", ScenarioStatus::Passed, None),
            record("Invalid login", ScenarioStatus::Failed, Some("expected error <banner>")),
            record("Search", ScenarioStatus::Broken, Some("browser crashed")),
            record("Later", ScenarioStatus::Skipped, None),
        ];
        let metrics = compute_metrics(&results);

        let xml = render_junit(&results, &metrics, "em2m", "2024-05-01T10:00:00").unwrap();

        assert!(xml.contains(r#"<testsuites name="em2m" tests="4" failures="1" errors="1" skipped="1""#));
        assert!(xml.contains(r#"<testcase name="Valid login" classname="Login" time="1.500"/>"#));
        assert!(xml.contains(r#"message="expected error &lt;banner&gt;""#));
        assert!(xml.contains(r#"<error message="browser crashed" type="Error">"#));
        assert!(xml.contains("<skipped/>"));
    }
}
