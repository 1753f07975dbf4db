use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use em2m_tester::driver::poll::CancelFlag;
use em2m_tester::driver::web::{PlaywrightLauncher, WebDriverConfig};
use em2m_tester::report::{self, ReportError, ReportFormat, ReportOptions};
use em2m_tester::runner::{self, ConsoleEventListener, EventEmitter};
use em2m_tester::utils::config::Config;

#[derive(Parser)]
#[command(name = "em2m-tester")]
#[command(version)]
#[command(about = "UI test automation for the EM2M web application", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run feature file(s) or a directory of them
    Run {
        /// Path to a feature file or directory
        #[arg(default_value = "features")]
        path: PathBuf,

        /// Configuration file (defaults to em2m.yaml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only run scenarios carrying all of these tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Browser engine: chromium, firefox or webkit
        #[arg(short, long)]
        browser: Option<String>,

        /// Directory for result records
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Generate the HTML report after the run
        #[arg(long)]
        report: bool,
    },

    /// Generate a report from existing result records
    Report {
        /// Directory holding <uuid>-result.json records
        #[arg(short, long)]
        results_dir: Option<PathBuf>,

        /// Output format: html, json or junit
        #[arg(short, long, default_value = "html")]
        format: ReportFormat,

        /// Output file (defaults to <reportDir>/test_report.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to em2m.yaml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run {
            path,
            config,
            tags,
            headless,
            browser,
            results_dir,
            report,
        } => {
            let mut config = Config::load(config.as_deref())?;
            if headless {
                config.headless = true;
            }
            if let Some(browser) = browser {
                config.browser = browser;
            }
            if let Some(dir) = results_dir {
                config.results_dir = dir;
            }

            println!(
                "{} Running scenarios from: {}",
                "▶".green().bold(),
                path.display()
            );
            println!("  Base URL: {}", config.base_url.cyan());
            println!(
                "  Browser: {}{}",
                config.browser.cyan(),
                if config.headless { " (headless)" } else { "" }
            );
            if !tags.is_empty() {
                println!("  Tags: {}", tags.join(", ").yellow());
            }
            println!("  Results: {}", config.results_dir.display().to_string().cyan());

            let cancel = CancelFlag::new();
            let handler_flag = cancel.clone();
            ctrlc::set_handler(move || {
                println!("\n{} Cancelling, waiting for the current step...", "⏹".yellow());
                handler_flag.cancel();
            })?;

            let launcher = Arc::new(PlaywrightLauncher::new(WebDriverConfig::from_config(&config)?));
            let (emitter, receiver) = EventEmitter::new();
            let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

            let outcome =
                runner::run_scenarios(&path, &config, launcher, &tags, cancel, emitter).await;
            // The emitter is gone once the run returns, which ends the listener
            let _ = listener.await;
            let summary = outcome?;

            if report {
                let output = config.report_dir.join(ReportFormat::Html.default_file_name());
                write_report(&config, &config.results_dir, ReportFormat::Html, &output)?;
            }

            Ok(if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Report {
            results_dir,
            format,
            output,
            config,
        } => {
            let config = Config::load(config.as_deref())?;
            let results_dir = results_dir.unwrap_or_else(|| config.results_dir.clone());
            let output =
                output.unwrap_or_else(|| config.report_dir.join(format.default_file_name()));

            println!(
                "{} Generating report from: {}",
                "📊".to_string().blue(),
                results_dir.display()
            );
            write_report(&config, &results_dir, format, &output)
        }
    }
}

/// Generate one report and print its summary; source errors become guidance
fn write_report(
    config: &Config,
    results_dir: &Path,
    format: ReportFormat,
    output: &Path,
) -> anyhow::Result<ExitCode> {
    let options = ReportOptions {
        title: config.report.title.clone(),
        max_steps: config.report.max_steps,
    };

    let summary = match report::generate_report(results_dir, format, output, &options) {
        Ok(summary) => summary,
        Err(e) => match e.downcast_ref::<ReportError>() {
            Some(ReportError::SourceUnavailable { path, .. }) => {
                eprintln!(
                    "{} Results directory {} not found.",
                    "✗".red().bold(),
                    path.display()
                );
                eprintln!("  Run the tests first: em2m-tester run features");
                return Ok(ExitCode::FAILURE);
            }
            Some(ReportError::NoResults { path }) => {
                eprintln!(
                    "{} No result records in {}.",
                    "✗".red().bold(),
                    path.display()
                );
                eprintln!("  Run the tests first: em2m-tester run features");
                return Ok(ExitCode::FAILURE);
            }
            _ => return Err(e),
        },
    };

    let m = &summary.metrics;
    println!("\n{} Report generated", "✓".green().bold());
    println!("  Total: {}", m.total);
    println!(
        "  {} passed, {} failed, {} skipped, {} broken",
        m.passed.to_string().green(),
        m.failed.to_string().red(),
        m.skipped.to_string().yellow(),
        m.broken.to_string().yellow()
    );
    println!("  Pass rate: {:.1}%", m.pass_rate);
    println!("  Duration: {}", report::format_duration(m.total_duration));
    if summary.skipped_records > 0 {
        println!(
            "  {} {} malformed records skipped",
            "⚠".yellow(),
            summary.skipped_records
        );
    }

    let absolute = std::fs::canonicalize(&summary.output).unwrap_or(summary.output);
    println!("  {}", format!("file://{}", absolute.display()).cyan());

    Ok(ExitCode::SUCCESS)
}
