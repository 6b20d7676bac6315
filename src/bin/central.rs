//! # Environment Monitor Central
//!
//! Desktop-side consumer: scans for nodes, connects to one and prints each
//! telemetry notification as a label line plus a value line (or JSON
//! lines), optionally logging to `<log_dir>/<tag>/DDMMYYYY.csv`.
//!
//! ```bash
//! env-monitor-central                       # list nodes
//! env-monitor-central --peripheral lab_1    # stream from lab_1
//! env-monitor-central --peripheral lab_1 --rename attic
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use futures_util::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use environment_monitor::config::Config;
use environment_monitor::identity::sanitize_command;
use environment_monitor::consumer::central::{parse_uuid, BleCentral};
use environment_monitor::consumer::{ConsumerSession, ExportFormat};
use environment_monitor::telemetry::{Clock, LogRotator, SystemClock};

/// How often the link is checked while idle
const CONNECTION_CHECK_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(version, about = "BLE central for environment monitor nodes")]
struct Args {
    /// Configuration file
    #[arg(long, env = "ENV_MONITOR_CONFIG", default_value = "config/default.toml")]
    config: PathBuf,

    /// Node to connect to; without it the central only scans
    #[arg(long)]
    peripheral: Option<String>,

    /// Rename the connected node before streaming (spaces become '_')
    #[arg(long, requires = "peripheral")]
    rename: Option<String>,

    /// Output format (overrides the config file)
    #[arg(long, value_enum)]
    export: Option<ExportFormat>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let central_config = &config.central;

    let central = BleCentral::new(
        parse_uuid(&central_config.service_uuid)?,
        parse_uuid(&central_config.characteristic_uuid)?,
    )
    .await
    .context("failed to open Bluetooth adapter")?;
    let timeout = Duration::from_secs(central_config.scan_timeout_s);

    let rename = args
        .rename
        .as_deref()
        .map(|raw| {
            sanitize_command(format!("{raw}\n").as_bytes())
                .ok_or_else(|| anyhow!("'{raw}' is not a usable device name"))
        })
        .transpose()?;

    let Some(name) = args.peripheral else {
        let names = central
            .scan(central_config.scan_count, timeout)
            .await
            .context("BLE scan failed")?;
        println!("Available peripheral(s)");
        for name in names {
            println!("{name}");
        }
        return Ok(());
    };

    let subscription = central
        .connect(&name, timeout)
        .await
        .with_context(|| format!("failed to connect to {name}"))?;

    if let Some(new_name) = &rename {
        subscription
            .rename(new_name)
            .await
            .with_context(|| format!("failed to rename {name}"))?;
        println!("Renamed {name} to {new_name}");
    }

    let rotator = central_config
        .log_dir
        .as_ref()
        .map(|dir| LogRotator::new(dir, "csv", config.storage.delimiter));
    let format = args.export.unwrap_or(central_config.export);
    let mut session = ConsumerSession::new(format, config.storage.delimiter, rotator);
    let clock = SystemClock;

    let mut notifications = subscription
        .notifications()
        .await
        .context("failed to subscribe to telemetry")?;
    let mut check = tokio::time::interval(CONNECTION_CHECK_INTERVAL);
    info!("Logging {} (Ctrl+C to stop)", subscription.name());

    loop {
        tokio::select! {
            notification = notifications.next() => {
                let Some(notification) = notification else {
                    break;
                };
                if notification.uuid != subscription.characteristic() {
                    continue;
                }
                match session.handle_notification(&notification.value, &clock.now()) {
                    Ok(out) => println!("{out}"),
                    Err(e) => warn!("Dropped notification: {}", e),
                }
            }

            _ = check.tick() => {
                if !subscription.is_connected().await {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, disconnecting...");
                subscription.disconnect().await?;
                return Ok(());
            }
        }
    }

    println!("Peripheral disconnected.");
    Ok(())
}
