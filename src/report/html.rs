use super::metrics::format_duration;
use super::types::{RunMetrics, ScenarioResult};

/// Rendering knobs for the HTML report
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    /// Steps listed per scenario before "... and N more steps"
    pub max_steps: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "EM2M Test Automation Report".to_string(),
            max_steps: 5,
        }
    }
}

/// Render a self-contained HTML report
///
/// The output depends only on the inputs: calling it twice with the same
/// `generated_at` yields identical bytes.
pub fn render_report(
    results: &[ScenarioResult],
    metrics: &RunMetrics,
    options: &ReportOptions,
    generated_at: &str,
) -> String {
    let mut sorted: Vec<&ScenarioResult> = results.iter().collect();
    sorted.sort_by(|a, b| {
        a.name
            .as_deref()
            .unwrap_or("")
            .cmp(b.name.as_deref().unwrap_or(""))
    });

    let mut tests_html = String::new();
    for result in sorted {
        tests_html.push_str(&render_scenario(result, options.max_steps));
    }

    let title = html_escape(&options.title);
    let pass_rate = format!("{:.1}", metrics.pass_rate);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}

        body {{
            font-family: system-ui, -apple-system, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: #2d3748;
            padding: 20px;
            min-height: 100vh;
        }}

        .container {{
            max-width: 1200px;
            margin: 0 auto;
        }}

        .panel {{
            background: white;
            padding: 30px;
            border-radius: 10px;
            margin-bottom: 20px;
            box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
        }}

        h1 {{
            font-size: 2em;
            margin-bottom: 10px;
        }}

        h2 {{
            margin-bottom: 20px;
        }}

        .subtitle {{
            color: #718096;
            font-size: 1.1em;
        }}

        .metrics {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 20px;
            margin-bottom: 20px;
        }}

        .metric-card {{
            background: white;
            padding: 25px;
            border-radius: 10px;
            box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
            text-align: center;
        }}

        .metric-card .value {{
            font-size: 3em;
            font-weight: bold;
            margin: 10px 0;
        }}

        .metric-card .label {{
            color: #718096;
            font-size: 0.9em;
            text-transform: uppercase;
            letter-spacing: 1px;
        }}

        .metric-card.total .value {{ color: #4299e1; }}
        .metric-card.passed .value {{ color: #48bb78; }}
        .metric-card.failed .value {{ color: #f56565; }}
        .metric-card.skipped .value {{ color: #a0aec0; }}

        .progress-bar {{
            width: 100%;
            height: 40px;
            background: #e2e8f0;
            border-radius: 20px;
            overflow: hidden;
            margin: 20px 0;
        }}

        .progress-fill {{
            height: 100%;
            background: linear-gradient(90deg, #48bb78, #38a169);
            display: flex;
            align-items: center;
            justify-content: center;
            color: white;
            font-weight: bold;
        }}

        .duration-line {{
            text-align: center;
            color: #718096;
        }}

        .test-item {{
            padding: 20px;
            border-left: 4px solid #cbd5e0;
            margin-bottom: 15px;
            background: #f7fafc;
            border-radius: 5px;
        }}

        .test-item.passed {{ border-left-color: #48bb78; }}
        .test-item.failed {{ border-left-color: #f56565; }}
        .test-item.broken {{ border-left-color: #ed8936; }}

        .test-name {{
            font-size: 1.2em;
            font-weight: 600;
            margin-bottom: 10px;
        }}

        .test-status {{
            display: inline-block;
            padding: 5px 15px;
            border-radius: 15px;
            font-size: 0.85em;
            font-weight: 600;
            text-transform: uppercase;
            background: #e2e8f0;
            color: #4a5568;
        }}

        .test-status.passed {{ background: #c6f6d5; color: #22543d; }}
        .test-status.failed {{ background: #fed7d7; color: #742a2a; }}
        .test-status.broken {{ background: #feebc8; color: #7b341e; }}

        .test-duration {{
            color: #718096;
            font-size: 0.9em;
            margin-left: 15px;
        }}

        .test-message {{
            margin-top: 10px;
            padding: 10px;
            background: #fff5f5;
            border-radius: 5px;
            color: #742a2a;
            font-family: ui-monospace, monospace;
            font-size: 0.85em;
            white-space: pre-wrap;
        }}

        .test-steps {{
            margin-top: 15px;
            padding-left: 20px;
        }}

        .step {{
            padding: 6px 0;
            color: #4a5568;
        }}

        .step.more {{
            color: #a0aec0;
        }}

        .footer {{
            text-align: center;
            color: white;
            margin-top: 30px;
            padding: 20px;
        }}
    </style>
</head>
<body>
    <div class="container">
        <div class="panel">
            <h1>{title}</h1>
            <p class="subtitle">Generated on {generated_at}</p>
        </div>

        <div class="metrics">
            <div class="metric-card total">
                <div class="label">Total</div>
                <div class="value">{total}</div>
            </div>
            <div class="metric-card passed">
                <div class="label">Passed</div>
                <div class="value">{passed}</div>
            </div>
            <div class="metric-card failed">
                <div class="label">Failed</div>
                <div class="value">{failed}</div>
            </div>
            <div class="metric-card skipped">
                <div class="label">Skipped</div>
                <div class="value">{skipped}</div>
            </div>
        </div>

        <div class="panel">
            <h2>Pass Rate</h2>
            <div class="progress-bar">
                <div class="progress-fill" style="width: {pass_rate}%">{pass_rate}%</div>
            </div>
            <p class="duration-line">Duration: {duration}</p>
        </div>

        <div class="panel">
            <h2>Test Results</h2>
{tests_html}        </div>

        <div class="footer">
            <p>{title}</p>
        </div>
    </div>
</body>
</html>
"#,
        title = title,
        generated_at = html_escape(generated_at),
        total = metrics.total,
        passed = metrics.passed,
        failed = metrics.failed,
        skipped = metrics.skipped,
        pass_rate = pass_rate,
        duration = format_duration(metrics.total_duration),
        tests_html = tests_html,
    )
}

fn render_scenario(result: &ScenarioResult, max_steps: usize) -> String {
    let name = result.name.as_deref().unwrap_or("Unknown Test");
    let status = result.status.as_ref().map_or("unknown", |s| s.as_str());
    let seconds = result.duration().as_secs_f64();

    let message_html = match result.message() {
        Some(msg) => format!(
            "\n                <div class=\"test-message\">{}</div>",
            html_escape(msg)
        ),
        None => String::new(),
    };

    let mut steps_html = String::new();
    if !result.steps.is_empty() {
        steps_html.push_str("\n                <div class=\"test-steps\">");
        for step in result.steps.iter().take(max_steps) {
            steps_html.push_str(&format!(
                "\n                    <div class=\"step\">{}</div>",
                html_escape(step.name.as_deref().unwrap_or("Step"))
            ));
        }
        if result.steps.len() > max_steps {
            steps_html.push_str(&format!(
                "\n                    <div class=\"step more\">... and {} more steps</div>",
                result.steps.len() - max_steps
            ));
        }
        steps_html.push_str("\n                </div>");
    }

    let status = html_escape(status);
    format!(
        r#"            <div class="test-item {status}">
                <div class="test-name">{name}</div>
                <span class="test-status {status}">{status}</span>
                <span class="test-duration">{seconds:.2}s</span>{message_html}{steps_html}
            </div>
"#,
        status = status,
        name = html_escape(name),
        seconds = seconds,
        message_html = message_html,
        steps_html = steps_html,
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::metrics::compute_metrics;
    use crate::report::types::{ScenarioStatus, StepResult};

    fn scenario(name: Option<&str>, status: &str, steps: usize) -> ScenarioResult {
        ScenarioResult {
            name: name.map(str::to_string),
            status: Some(ScenarioStatus::from(status.to_string())),
            start: Some(1_000),
            stop: Some(3_500),
            steps: (1..=steps)
                .map(|i| StepResult {
                    name: Some(format!("step number {}", i)),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn render(results: &[ScenarioResult]) -> String {
        let metrics = compute_metrics(results);
        render_report(results, &metrics, &ReportOptions::default(), "2024-05-01 10:00:00")
    }

    #[test]
    fn test_long_step_lists_are_truncated() {
        let html = render(&[scenario(Some("Search"), "passed", 8)]);
        assert!(html.contains("step number 5"));
        assert!(!html.contains("step number 6"));
        assert!(html.contains("... and 3 more steps"));
    }

    #[test]
    fn test_exactly_max_steps_has_no_indicator() {
        let html = render(&[scenario(Some("Search"), "passed", 5)]);
        assert!(html.contains("step number 5"));
        assert!(!html.contains("more steps"));
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let mut no_status = scenario(None, "passed", 1);
        no_status.status = None;
        no_status.steps[0].name = None;

        let html = render(&[no_status]);
        assert!(html.contains("Unknown Test"));
        assert!(html.contains(">unknown<"));
        assert!(html.contains("<div class=\"step\">Step</div>"));
    }

    #[test]
    fn test_duration_has_two_decimals() {
        let html = render(&[scenario(Some("Login"), "passed", 0)]);
        assert!(html.contains("2.50s"));
    }

    #[test]
    fn test_scenarios_sorted_by_name() {
        let html = render(&[
            scenario(Some("b scenario"), "passed", 0),
            scenario(Some("A scenario"), "failed", 0),
            scenario(None, "passed", 0),
        ]);
        let unknown = html.find("Unknown Test").unwrap();
        let a = html.find("A scenario").unwrap();
        let b = html.find("b scenario").unwrap();
        assert!(unknown < a && a < b);
    }

    #[test]
    fn test_user_text_is_escaped() {
        let mut result = scenario(Some("<script>alert(1)</script>"), "failed", 1);
        result.steps[0].name = Some("click \"Save\" & <b>".to_string());
        let html = render(&[result]);

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("click &quot;Save&quot; &amp; &lt;b&gt;"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let results = vec![
            scenario(Some("One"), "passed", 2),
            scenario(Some("Two"), "failed", 7),
        ];
        assert_eq!(render(&results), render(&results));
    }

    #[test]
    fn test_self_contained() {
        let html = render(&[scenario(Some("One"), "passed", 1)]);
        assert!(!html.contains("<link"));
        assert!(!html.contains("http://"));
        assert!(!html.contains("https://"));
        assert!(html.contains("Generated on 2024-05-01 10:00:00"));
        assert!(html.contains("width: 100.0%"));
    }
}
