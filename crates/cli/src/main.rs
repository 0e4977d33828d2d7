use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use pathwatch_detector_core::DeadlineKind;
use pathwatch_monitor::{
    setup_logging, ConnectionMonitor, MonitorConfig, MonitorEvent, PathwatchConfig,
};
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pathwatch", version, about = "Simulate and inspect network path failure detection")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "PATHWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true, env = "PATHWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed forward progress to a monitor for a while, then go silent and
    /// report detections until the path is declared blackholed
    Simulate(SimulateArgs),

    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Args)]
struct SimulateArgs {
    /// Probe timeout used to derive the detection deadlines
    #[arg(long, default_value_t = 100)]
    pto_ms: u64,

    /// How long forward progress is reported before the path goes silent
    #[arg(long, default_value_t = 1_000)]
    progress_for_ms: u64,

    /// Interval between forward progress reports
    #[arg(long, default_value_t = 50)]
    progress_interval_ms: u64,

    /// Give up waiting for detections after this long
    #[arg(long, default_value_t = 60_000)]
    timeout_ms: u64,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PathwatchConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PathwatchConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
        config.validate()?;
    }

    match cli.command {
        Command::ShowConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Simulate(args) => {
            setup_logging(&config.logging)?;
            info!(version = env!("CARGO_PKG_VERSION"), "Starting pathwatch");
            simulate(config.monitor, args).await?;
        }
    }

    Ok(())
}

async fn simulate(config: MonitorConfig, args: SimulateArgs) -> Result<()> {
    ensure!(args.pto_ms > 0, "--pto-ms must be positive");
    ensure!(
        args.progress_interval_ms > 0,
        "--progress-interval-ms must be positive"
    );

    let close_on_blackhole = config.close_on_blackhole;
    let (monitor, mut events) = ConnectionMonitor::spawn(config)?;
    let clock = monitor.clock();
    let pto = Duration::from_millis(args.pto_ms);

    let progress_until = Instant::now()
        .checked_add(Duration::from_millis(args.progress_for_ms))
        .context("--progress-for-ms is too large")?;
    let mut ticker = tokio::time::interval(Duration::from_millis(args.progress_interval_ms));
    let mut reports = 0u64;
    loop {
        ticker.tick().await;
        if Instant::now() >= progress_until {
            break;
        }
        monitor.on_forward_progress(pto).await?;
        reports += 1;
    }
    info!(connection = %monitor.label(), reports, at = %clock.timestamp_of(Instant::now()), "Forward progress stopped");

    let timeout = tokio::time::sleep(Duration::from_millis(args.timeout_ms));
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                print_event(&event, args.json);
                match event {
                    MonitorEvent::Closed { .. } => break,
                    MonitorEvent::Detected { kind: DeadlineKind::Blackhole, .. } if !close_on_blackhole => break,
                    MonitorEvent::Detected { .. } => {}
                }
            }
            _ = &mut timeout => {
                warn!(connection = %monitor.label(), "Timed out waiting for blackhole detection");
                break;
            }
        }
    }

    let status = monitor.status().await?;
    info!(connection = %monitor.label(), state = %status.state, "Simulation finished");
    monitor.shutdown().await?;
    Ok(())
}

fn print_event(event: &MonitorEvent, json: bool) {
    let (name, at) = match event {
        MonitorEvent::Detected { kind, at, .. } => (kind.to_string(), *at),
        MonitorEvent::Closed { at, .. } => ("closed".to_string(), *at),
    };

    if json {
        let line = serde_json::json!({
            "connection": event.connection(),
            "event": name,
            "at_ms": u64::try_from(at.as_duration().as_millis()).unwrap_or(u64::MAX),
        });
        println!("{}", line);
    } else {
        println!("{:>14}  {:<20} {}", at.to_string(), name, event.connection());
    }
}
