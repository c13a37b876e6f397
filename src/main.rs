//! ergrace - Main Entry Point
//!
//! Logs RowErg monitor readings to `erg_<YYMMDD_HHMMSS>.csv` until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use ergrace::{
    config::AppConfig, device, CsvLogger, DeviceSession, PollLoop, ShutdownSignal,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log Concept2 RowErg monitor data to CSV
#[derive(Parser)]
#[command(name = "ergrace", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving the CSV log
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only log readings that differ from the previous one
    #[arg(long)]
    skip_unchanged: bool,

    /// Milliseconds between polls
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many polls
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(ref dir) = self.output_dir {
            config.output.directory = dir.clone();
        }
        if self.skip_unchanged {
            config.poll.skip_unchanged = true;
        }
        if let Some(ms) = self.interval_ms {
            config.poll.interval_ms = ms;
        }
        if self.max_ticks.is_some() {
            config.poll.max_ticks = self.max_ticks;
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info,ergrace=debug",
        1 => "debug,ergrace=trace",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config =
        AppConfig::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate()?;

    let shutdown = ShutdownSignal::new();
    shutdown.install_ctrl_c_handler()?;

    let started = chrono::Local::now().naive_local();
    let (path, logger) = CsvLogger::create_in_dir(&config.output.directory, &started)?;
    println!("Saving to CSV file \"{}\"", path.display());

    let driver = device::driver_from_config(&config)?;
    tracing::info!("Using {} driver", config.device.driver);
    let session = DeviceSession::from_config(driver, &config.device, &shutdown);

    let mut poll = PollLoop::new(session, logger, config.poll.clone(), shutdown);
    poll.run()?;

    tracing::info!("Log saved to {}", path.display());
    Ok(())
}
