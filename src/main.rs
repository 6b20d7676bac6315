//! # Environment Monitor Node
//!
//! Samples humidity, temperature and pressure, publishes each sample over
//! the BLE radio bridge and logs it to removable storage.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (defaults if the file is missing)
//!    - Set up logging (console, plus optional daily log file)
//!    - Open the radio bridge, load the device name, start advertising
//!
//! 2. **Main Loop**
//!    - Run one telemetry cycle per tick
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Sensor Fault**
//!    - Show the fault and stall until Ctrl+C; the node needs service
//!
//! ```bash
//! env-monitor --config config/default.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use environment_monitor::config::Config;
use environment_monitor::identity::FileIdentityPersistence;
use environment_monitor::link::serial::SerialLink;
use environment_monitor::node::sensor::IioSensor;
use environment_monitor::node::status::TracingDisplay;
use environment_monitor::node::TelemetryNode;
use environment_monitor::telemetry::{LogRotator, SystemClock};

/// Number of cycles between status log messages
const LOG_INTERVAL_CYCLES: u64 = 100;

#[derive(Debug, Parser)]
#[command(version, about = "Environment telemetry node")]
struct Args {
    /// Configuration file
    #[arg(long, env = "ENV_MONITOR_CONFIG", default_value = "config/default.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let _log_guard = init_logging(config.logging.dir.as_deref());
    info!("Environment Monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let link = SerialLink::open_with_paths(&[config.link.port.as_str()], config.link.baud_rate)
        .context("failed to open radio bridge")?;
    info!("Radio bridge opened at: {}", link.device_path());

    let root = PathBuf::from(&config.storage.root);
    let mut node = TelemetryNode::boot(
        IioSensor::new(&config.sensor.iio_device),
        link,
        FileIdentityPersistence::new(&root, config.storage.identity_file.as_str()),
        LogRotator::new(&root, config.storage.log_extension.as_str(), config.storage.delimiter),
        TracingDisplay::new(),
        SystemClock,
        config.node.screen_cycle_ticks,
    );
    info!("Device name: {}", node.identity());

    let mut ticker = interval(Duration::from_millis(config.node.cycle_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Starting telemetry loop every {}ms", config.node.cycle_interval_ms);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match node.run_cycle() {
                    Ok(_) => {
                        if node.cycles() % LOG_INTERVAL_CYCLES == 0 {
                            info!("Completed {} cycles as '{}' (link {})",
                                node.cycles(), node.identity(), node.link_state());
                        }
                    }
                    Err(fault) => {
                        error!("Sensor fault, halting: {}", fault);
                        node.halt(&fault);
                        tokio::signal::ctrl_c().await.context("failed to wait for Ctrl+C")?;
                        return Err(fault).context("node halted on sensor fault");
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total cycles: {}", node.cycles());
                break;
            }
        }
    }

    Ok(())
}

/// Console logging, plus a daily-rolling file when `dir` is set
fn init_logging(dir: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let console = tracing_subscriber::fmt::layer();

    match dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "env-monitor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_config_path() {
        let args = Args::parse_from(["env-monitor"]);
        assert_eq!(args.config, PathBuf::from("config/default.toml"));
    }

    #[test]
    fn test_args_custom_config_path() {
        let args = Args::parse_from(["env-monitor", "--config", "/etc/env.toml"]);
        assert_eq!(args.config, PathBuf::from("/etc/env.toml"));
    }
}
