//! Appid-Harvest main entry point
//!
//! This is the command-line interface for the catalog harvester.

use anyhow::Context;
use appid_harvest::config::{load_config_with_hash, validate, Config, OutputFormat};
use appid_harvest::crawler::{Crawler, Phase, ProgressEvent, TaskOutcome};
use appid_harvest::output::{export_records, print_statistics};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing_subscriber::EnvFilter;

/// Appid-Harvest: an application-signature catalog harvester
///
/// Walks every page of the catalog, fetches each application's detail page
/// and writes one row per application.
#[derive(Parser, Debug)]
#[command(name = "appid-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Harvest an application-signature catalog", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Catalog listing URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Maximum number of fetches in flight
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Seconds to wait between attempts of a failed fetch
    #[arg(long, value_name = "SECS")]
    retry_delay: Option<f64>,

    /// Retries after the first attempt
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (inferred from the output extension when omitted)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Do not render a progress bar
    #[arg(long)]
    no_progress: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("appid_harvest=info,warn"),
            1 => EnvFilter::new("appid_harvest=debug,info"),
            2 => EnvFilter::new("appid_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config.crawler.base_url = base_url.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(retry_delay) = cli.retry_delay {
        config.crawler.retry_delay = retry_delay;
    }
    if let Some(max_retries) = cli.max_retries {
        config.crawler.max_retries = max_retries;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
        if cli.format.is_none() {
            config.output.format = infer_format(output).unwrap_or(config.output.format);
        }
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if cli.no_progress || cli.quiet {
        config.output.show_progress = false;
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

fn infer_format(path: &Path) -> Option<OutputFormat> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "csv" => Some(OutputFormat::Csv),
        "json" => Some(OutputFormat::Json),
        _ => None,
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Appid-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Detail URL: {}", config.crawler.detail_template());
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Request delay: {}s", config.crawler.request_delay);
    println!("  Retry delay: {}s", config.crawler.retry_delay);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Concurrency: {}", config.crawler.concurrency);

    println!("\nOutput:");
    println!("  Path: {}", config.output.path);
    println!("  Format: {:?}", config.output.format);
    println!("  Progress bar: {}", config.output.show_progress);

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, quiet: bool) -> anyhow::Result<()> {
    let crawler = Crawler::new(config)?;

    let output_path = PathBuf::from(&crawler.config().output.path);
    let format = crawler.config().output.format;
    let show_progress = crawler.config().output.show_progress;

    let report = if show_progress {
        let (tx, rx) = unbounded_channel();
        let renderer = tokio::spawn(render_progress(rx));

        let crawler = crawler.with_observer(Arc::new(tx));
        let report = crawler.run().await;

        // Dropping the crawler closes the channel so the renderer can finish.
        drop(crawler);
        renderer.await.context("progress renderer panicked")?;
        report
    } else {
        crawler.run().await
    };

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    export_records(&report.records, &output_path, format)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    if !quiet {
        println!();
        print_statistics(&report.stats);
        println!("\n✓ Saved {} records to {}", report.records.len(), output_path.display());
    }

    Ok(())
}

/// Renders progress events as one bar per phase
async fn render_progress(mut events: UnboundedReceiver<ProgressEvent>) {
    let style = ProgressStyle::with_template(
        "{prefix:>8.cyan.bold} [{bar:40.green/white}] {pos}/{len} ({eta}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");

    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::PhaseStarted { phase, total } => {
                if let Some(previous) = bar.take() {
                    previous.finish();
                }
                let next = ProgressBar::new(total as u64).with_style(style.clone());
                next.set_prefix(phase_label(phase));
                bar = Some(next);
            }
            ProgressEvent::TaskFinished {
                phase,
                key,
                outcome,
            } => {
                let Some(bar) = &bar else { continue };
                bar.inc(1);
                match outcome {
                    TaskOutcome::Succeeded { .. } => {
                        bar.set_message(format!("{} {}", phase_label(phase), key));
                    }
                    TaskOutcome::Failed { attempts, reason } => {
                        bar.println(format!(
                            "✗ {} {} failed after {} attempts: {}",
                            phase_label(phase),
                            key,
                            attempts,
                            reason
                        ));
                    }
                }
            }
        }
    }

    if let Some(bar) = bar {
        bar.finish_with_message("done");
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Page => "Pages",
        Phase::Detail => "Apps",
    }
}
