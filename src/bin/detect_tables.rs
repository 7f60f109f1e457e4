use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chat_table_extractor::batch::extract_batch;
use chat_table_extractor::models::BatchTableDetectionResult;
use chat_table_extractor::options::DetectorConfig;
use chat_table_extractor::registry::ScanReport;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "detect-tables",
    version,
    about = "Detect and extract tables from a saved AI chat page"
)]
struct Cli {
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long)]
    url: String,

    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    chat_title: Option<String>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    pretty: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<DetectorConfig> {
    let Some(path) = path else {
        return Ok(DetectorConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;
    DetectorConfig::from_json(&raw)
        .with_context(|| format!("invalid detector config '{}'", path.display()))
}

fn log_report(report: &ScanReport, verbose: bool) {
    if report.issues.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.issues.len());
    if verbose {
        for issue in &report.issues {
            eprintln!(
                "  - {:?} strategy={:?}: {}",
                issue.code,
                issue.strategy.map(|strategy| strategy.name()),
                issue.message
            );
        }
    }
}

fn run(cli: &Cli) -> Result<(BatchTableDetectionResult, ScanReport)> {
    let config = load_config(cli.config.as_ref())?;
    let html = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read '{}'", cli.input.display()))?;
    let (batch, report) = extract_batch(&cli.url, &html, cli.chat_title.clone(), config)
        .context("failed to set up table detection")?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&batch)?
    } else {
        serde_json::to_string(&batch)?
    };
    match &cli.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write '{}'", path.display()))?,
        None => println!("{json}"),
    }

    Ok((batch, report))
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chat_table_extractor=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok((batch, report)) => {
            log_report(&report, cli.verbose);
            if batch.count > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
