use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;

use logsentinel::config::{AppConfig, DecodePolicy, LogFormat};
use logsentinel::ingest::progress::{run_spinner, CounterDisplay, SPINNER_INTERVAL};
use logsentinel::ingest::NoProgress;

#[derive(Parser)]
#[command(
    name = "logsentinel",
    about = "Critical-burst detection over structured event logs",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Diagnostic log format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process an event feed and detect critical bursts
    Ingest {
        /// Newline-delimited JSON events ("-" for stdin)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Alert snapshot destination
        #[arg(long)]
        alerts: Option<PathBuf>,

        /// Operator trace log
        #[arg(long)]
        trace_log: Option<PathBuf>,

        /// Pause before each record, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Skip undecodable records instead of stopping
        #[arg(long)]
        skip_invalid: bool,

        /// Reject levels other than INFO, WARN, ERROR, CRITICAL
        #[arg(long)]
        strict_levels: bool,

        /// No spinner or live counter
        #[arg(long)]
        quiet: bool,
    },

    /// Show the persisted alert snapshot
    Alerts {
        /// Alert snapshot to read
        #[arg(long)]
        alerts: Option<PathBuf>,

        /// Raw JSON output
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

fn init_tracing(cfg: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cfg.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = AppConfig::resolve(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        cfg.logging.format = format;
    }
    init_tracing(&cfg);

    match cli.command {
        Commands::Ingest {
            input,
            alerts,
            trace_log,
            delay_ms,
            skip_invalid,
            strict_levels,
            quiet,
        } => {
            if let Some(input) = input {
                cfg.input.path = input;
            }
            if let Some(alerts) = alerts {
                cfg.alerts.path = alerts;
            }
            if let Some(trace_log) = trace_log {
                cfg.logging.trace_log_path = trace_log;
            }
            if let Some(delay_ms) = delay_ms {
                cfg.input.delay_ms = delay_ms;
            }
            if skip_invalid {
                cfg.input.on_decode_error = DecodePolicy::Skip;
            }
            if strict_levels {
                cfg.input.strict_levels = true;
            }

            let (analyzer, result) = if quiet {
                logsentinel::ingest(&cfg, &mut NoProgress).await?
            } else {
                let (done_tx, done_rx) = oneshot::channel();
                let spinner = tokio::spawn(run_spinner(std::io::stdout(), done_rx, SPINNER_INTERVAL));
                let mut counter = CounterDisplay::new(std::io::stdout());
                let outcome = logsentinel::ingest(&cfg, &mut counter).await;
                let _ = done_tx.send(());
                let _ = spinner.await;
                println!();
                outcome?
            };

            println!();
            print!("{}", logsentinel::report::format_summary(&analyzer));
            let summary = result?;
            println!("\nRun {} finished: {} processed, {} skipped.", summary.run_id, summary.processed, summary.skipped);
        }
        Commands::Alerts { alerts, json } => {
            let path = alerts.unwrap_or(cfg.alerts.path);
            let list = logsentinel::storage::load_alerts(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                print!("{}", logsentinel::report::format_alerts(&list));
            }
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}
