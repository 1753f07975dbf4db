use tokio::sync::broadcast;

use crate::report::ScenarioStatus;

/// Counters printed when a run ends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub scenarios: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub not_started: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn record(&mut self, status: &ScenarioStatus) {
        self.scenarios += 1;
        match status {
            ScenarioStatus::Passed => self.passed += 1,
            ScenarioStatus::Failed => self.failed += 1,
            _ => self.broken += 1,
        }
    }

    /// Every executed scenario passed and none was cut by cancellation
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.broken == 0 && self.not_started == 0
    }
}

/// Run progress events
#[derive(Debug, Clone)]
pub enum TestEvent {
    RunStarted {
        run_id: String,
        scenario_count: usize,
    },
    RunFinished {
        summary: RunSummary,
    },

    FeatureStarted {
        name: String,
        path: String,
    },

    ScenarioStarted {
        name: String,
        step_count: usize,
    },
    ScenarioFinished {
        name: String,
        status: ScenarioStatus,
        duration_ms: u64,
        screenshot: Option<String>,
    },

    StepStarted {
        index: usize,
        step: String,
    },
    StepPassed {
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepSkipped {
        index: usize,
        step: String,
        reason: String,
    },

    Log {
        message: String,
    },
}

/// Event emitter for broadcasting run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use colored::{ColoredString, Colorize};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration as StdDuration;

fn status_label(status: &ScenarioStatus) -> ColoredString {
    match status {
        ScenarioStatus::Passed => "PASSED".green().bold(),
        ScenarioStatus::Failed => "FAILED".red().bold(),
        ScenarioStatus::Broken => "BROKEN".yellow().bold(),
        other => other.as_str().to_uppercase().white().bold(),
    }
}

/// Console event listener printing live progress
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        // Hidden target when piped, to keep escape codes out of logs
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::debug!("console listener skipped {} events", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::RunStarted {
                    run_id,
                    scenario_count,
                } => {
                    println!(
                        "\n{} Test run {} ({} scenarios)",
                        "▶".green().bold(),
                        run_id.cyan(),
                        scenario_count
                    );
                }

                TestEvent::RunFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Test run finished", "■".blue().bold());
                    println!("  Scenarios: {}", summary.scenarios);
                    println!(
                        "  {} passed, {} failed, {} broken",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.broken.to_string().yellow()
                    );
                    if summary.not_started > 0 {
                        println!(
                            "  {} not started (cancelled)",
                            summary.not_started.to_string().yellow()
                        );
                    }
                    println!("  Duration: {}ms", summary.duration_ms);
                }

                TestEvent::FeatureStarted { name, path } => {
                    println!(
                        "\n{} Feature: {} {}",
                        "→".blue(),
                        name.white().bold(),
                        format!("({})", path).dimmed()
                    );
                }

                TestEvent::ScenarioStarted { name, step_count } => {
                    println!("  {} {} ({} steps)", "•".blue(), name.bold(), step_count);
                }

                TestEvent::ScenarioFinished {
                    name,
                    status,
                    duration_ms,
                    screenshot,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!(
                        "  {} Scenario {} [{}] {}ms",
                        "←".blue(),
                        name,
                        status_label(&status),
                        duration_ms
                    );
                    if let Some(path) = screenshot {
                        println!("      Screenshot saved: {}", path.dimmed());
                    }
                }

                TestEvent::StepStarted { index, step } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("      {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    step_text = format!("[{}] {}... ", index, step.dimmed());
                    pb.set_message(step_text.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                TestEvent::StepPassed { duration_ms, .. } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("      {} {}({}ms)", "✓".green(), step_text, duration_ms);
                }

                TestEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("      {} {}({}ms)", "✗".red(), step_text, duration_ms);
                    println!("        {}", error.red());
                }

                TestEvent::StepSkipped {
                    index,
                    step,
                    reason,
                } => {
                    println!(
                        "      {} [{}] {} ({})",
                        "○".yellow(),
                        index,
                        step.dimmed(),
                        reason.dimmed()
                    );
                }

                TestEvent::Log { message } => {
                    multi.println(format!("        {}", message)).ok();
                }
            }
        }
    }
}
