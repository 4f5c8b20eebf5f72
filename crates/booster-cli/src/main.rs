use anyhow::Result;
use booster_cli::{BoostSession, Config};
use booster_core::{Classification, OutcomeResult, Plan, TerminationMode, TerminationReport, VERSION};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Booster - closes background apps before a game session
#[derive(Parser, Debug)]
#[command(name = "booster")]
#[command(version = VERSION)]
#[command(about = "Booster - background app closer for game sessions", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/booster/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which processes would be closed, without closing anything
    Plan {
        /// Termination mode: normal or extreme
        #[arg(short, long, default_value = "normal")]
        mode: TerminationMode,
    },

    /// Close background processes and print the report
    Run {
        /// Termination mode: normal or extreme
        #[arg(short, long, default_value = "normal")]
        mode: TerminationMode,

        /// Record what would be closed without signalling anything
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the captured process snapshot
    Snapshot,

    /// Run repeatedly at the configured interval until Ctrl-C
    Watch {
        /// Overrides the configured watch mode
        #[arg(short, long)]
        mode: Option<TerminationMode>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Output path for config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, loaded_from_file) = load_config(&cli.config)?;

    let _guard = init_logging(&config)?;

    info!("Booster v{} starting...", VERSION);
    if loaded_from_file {
        info!("Configuration loaded from: {:?}", cli.config);
    } else {
        warn!("Configuration file not found: {:?}, using defaults", cli.config);
    }
    info!("Logging to {:?} (rotated daily)", config.log_path());

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    match cli.command {
        Some(Commands::Plan { mode }) => run_plan(&config, mode)?,
        Some(Commands::Run {
            mode,
            dry_run,
            json,
        }) => run_once(&config, mode, dry_run, json)?,
        Some(Commands::Snapshot) => run_snapshot(&config)?,
        Some(Commands::Watch { mode, dry_run }) => {
            run_watch_loop(&config, mode.unwrap_or(config.watch.mode), dry_run).await?
        }
        Some(Commands::GenerateConfig { output }) => generate_config(&output)?,
        None => {
            info!("No command specified, showing plan");
            run_plan(&config, TerminationMode::Normal)?
        }
    }

    Ok(())
}

/// Capture and evaluate, print the decisions
fn run_plan(config: &Config, mode: TerminationMode) -> Result<()> {
    let mut session = BoostSession::from_config(config, true);
    let plan = session.plan(mode)?;
    print_plan(&plan);
    Ok(())
}

/// Single close run
fn run_once(config: &Config, mode: TerminationMode, dry_run: bool, json: bool) -> Result<()> {
    let mut session = BoostSession::from_config(config, dry_run);
    let report = session.run_once(mode)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_snapshot(config: &Config) -> Result<()> {
    let mut session = BoostSession::from_config(config, true);
    let snapshot = session.snapshot()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Continuous runs until interrupted
async fn run_watch_loop(config: &Config, mode: TerminationMode, dry_run: bool) -> Result<()> {
    info!(
        "Starting watch loop: {} mode every {}s",
        mode, config.watch.interval_secs
    );

    let mut session = BoostSession::from_config(config, dry_run);
    let mut interval = tokio::time::interval(Duration::from_secs(config.watch.interval_secs));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(report) = session.tick(mode) {
                    let terminated = report.terminated();
                    if !terminated.is_empty() {
                        info!("Closed: {}", terminated.join(", "));
                    }
                }

                let stats = session.stats();
                info!(
                    "Stats: runs={}, terminated={}, failed={}, denied={}, capture_failures={}",
                    stats.total_runs,
                    stats.total_terminated,
                    stats.total_failed,
                    stats.permission_denials,
                    stats.capture_failures
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch loop");
                break;
            }
        }
    }

    Ok(())
}

/// Generate default configuration file
fn generate_config(output: &Path) -> Result<()> {
    info!("Generating default configuration file: {:?}", output);

    Config::default()
        .save_to_file(output)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration file: {}", e))?;

    info!("Configuration file generated successfully");
    Ok(())
}

fn print_plan(plan: &Plan) {
    println!(
        "{}",
        format!("=== Booster Plan ({} mode) ===", plan.mode).green().bold()
    );
    if plan.restricted_enumeration {
        println!("{}", "Handles are not real pids on this device".yellow());
    }

    for entry in &plan.entries {
        let label = classification_label(entry.classification);
        let decision = if entry.should_close {
            "close".red().bold()
        } else {
            "keep".green()
        };
        println!(
            "  {:<6} {:<12} {} ({})",
            decision, label, entry.record.identifier, entry.record.native_handle
        );
    }

    println!(
        "\n{} of {} processes would be closed",
        plan.closable_count(),
        plan.len()
    );
}

fn print_report(report: &TerminationReport) {
    println!(
        "{}",
        format!("=== Booster Report ({} mode) ===", report.mode()).green().bold()
    );

    for outcome in report.outcomes() {
        let tag = match &outcome.result {
            OutcomeResult::Terminated => outcome.result.tag().red().bold(),
            OutcomeResult::Skipped(_) => outcome.result.tag().normal(),
            OutcomeResult::Failed(_) => outcome.result.tag().yellow(),
        };
        println!("  {:<28} {}", tag, outcome.identifier);
    }

    let summary = report.summary();
    println!(
        "\nClosed {} background apps ({} skipped, {} failed)",
        summary.terminated, summary.skipped, summary.failed
    );
}

fn classification_label(class: Classification) -> ColoredString {
    match class {
        Classification::Closable => class.label().normal(),
        Classification::Essential => class.label().cyan(),
        Classification::Protected => class.label().blue(),
        Classification::Foreground => class.label().magenta(),
        Classification::SelfProcess => class.label().dimmed(),
        Classification::Invalid => class.label().yellow(),
    }
}

/// Load configuration from file or use defaults
fn load_config(path: &Path) -> Result<(Config, bool)> {
    if path.exists() {
        let config = Config::load_from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration file: {}", e))?;
        Ok((config, true))
    } else {
        Ok((Config::default(), false))
    }
}

/// Initialize logging with stderr and daily-rotated file output
fn init_logging(config: &Config) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.logging.log_dir)?;

    let file_appender =
        tracing_appender::rolling::daily(&config.logging.log_dir, &config.logging.log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // stderr only; stdout carries plan/report output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    Ok(guard)
}
