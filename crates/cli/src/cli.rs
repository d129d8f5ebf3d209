//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::SensorKind;
use std::path::PathBuf;

/// biosync - timestamp synchronization for wearable biosignal streams
#[derive(Parser, Debug)]
#[command(
    name = "biosync",
    author,
    version,
    about = "Timestamp synchronization for EEG/PPG/ACC wearable streams",
    long_about = "Aligns device timestamps of a multi-sensor wearable onto the host clock.\n\n\
                  Simulates a device session with configurable clock drift, transport \n\
                  jitter and accelerometer timestamp cracking, runs it through the \n\
                  synchronization engine and reports timing quality."
)]
pub struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BIOSYNC_VERBOSE")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "BIOSYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate a device session and synchronize it
    Simulate(SimulateArgs),

    /// Validate a session configuration file
    Validate(ValidateArgs),

    /// Display thresholds and stream parameters
    Info(InfoArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to session configuration (TOML or JSON); defaults when omitted
    #[arg(short, long, env = "BIOSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override session length (device seconds)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Override device clock drift (ms per second)
    #[arg(long, allow_hyphen_values = true)]
    pub drift: Option<f64>,

    /// Override transport latency jitter amplitude (ms)
    #[arg(long)]
    pub jitter: Option<f64>,

    /// Override transport loss probability (0-1)
    #[arg(long)]
    pub loss: Option<f64>,

    /// Override late delivery probability (0-1)
    #[arg(long)]
    pub reorder: Option<f64>,

    /// Override simulator seed
    #[arg(long, env = "BIOSYNC_SEED")]
    pub seed: Option<u64>,

    /// Enable accelerometer timestamp cracking
    #[arg(long)]
    pub acc_cracking: bool,

    /// Override enabled sensors (comma separated: eeg,ppg,acc)
    #[arg(long, value_delimiter = ',')]
    pub sensors: Option<Vec<SensorKind>>,

    /// Stream through the ingestion pipeline on the wall clock instead of
    /// virtual time
    #[arg(long)]
    pub realtime: bool,

    /// Replay speed multiplier for --realtime
    #[arg(long, default_value = "1.0", requires = "realtime")]
    pub speed: f64,

    /// Timeout in seconds for --realtime (0 = no timeout)
    #[arg(long, default_value = "0")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BIOSYNC_METRICS_PORT")]
    pub metrics_port: u16,

    /// Output the session report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
