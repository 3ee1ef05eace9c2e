//! Tripwire alert monitor - Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use tripwire_monitor::{AppConfig, Application};
use tripwire_telemetry::LogFormat;

/// Position and price alert monitor with notification throttling
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TRIPWIRE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Log format: pretty or json (default: json when RUST_ENV=production)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the polling loop until ctrl-c (default)
    Run,
    /// Run a single evaluation cycle
    Once,
    /// Create missing alerts from the threshold document
    CreateAlerts,
    /// Delete every alert
    ResetAlerts,
    /// Print all alerts as JSON
    List,
    /// Suppress notifications for a while
    Snooze {
        /// Seconds (default: snooze_countdown from the threshold document)
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// End an active snooze
    ClearSnooze,
    /// Deep-merge a partial JSON document into the threshold document
    UpdateThresholds {
        /// JSON object, e.g. '{"alert_ranges": {"heat_index_ranges": {"low": 5}}}'
        json: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tripwire_telemetry::init_logging_with(args.log_format.unwrap_or_else(LogFormat::from_env))?;

    info!("Starting tripwire v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > TRIPWIRE_CONFIG env var > default
    let config = match &args.config {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            AppConfig::load_from(path)?
        }
        None => AppConfig::load()?,
    };
    info!(
        poll_interval_secs = config.poll_interval_secs,
        threshold_path = %config.threshold_path.display(),
        "Configuration loaded"
    );

    let app = Application::new(config)?;
    let manager = app.manager();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => app.run().await?,
        Command::Once => {
            let report = manager.run_cycle().await?;
            println!("{report:#?}");
        }
        Command::CreateAlerts => {
            let created = manager.create_all_alerts().await?;
            println!("Created {created} alerts");
        }
        Command::ResetAlerts => {
            let deleted = manager.delete_all_alerts()?;
            println!("Deleted {deleted} alerts");
        }
        Command::List => {
            let alerts = manager.registry().list()?;
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        Command::Snooze { seconds } => {
            let seconds = manager.start_snooze(seconds)?;
            println!("Notifications snoozed for {seconds}s");
        }
        Command::ClearSnooze => {
            manager.clear_snooze()?;
            println!("Snooze cleared");
        }
        Command::UpdateThresholds { json } => {
            let partial: serde_json::Value =
                serde_json::from_str(&json).context("Threshold update is not valid JSON")?;
            let doc = manager.update_thresholds(partial)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(())
}
