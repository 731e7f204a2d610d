//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CARLA Cockpit - multi-camera driving cockpit for the CARLA simulator
#[derive(Parser, Debug)]
#[command(
    name = "carla-cockpit",
    author,
    version,
    about = "Multi-camera driving cockpit for the CARLA simulator",
    long_about = "Drives an ego vehicle in CARLA from an input device at a fixed rate.\n\n\
                  Renders a five-camera HUD, records per-camera video and per-session \n\
                  drive and collision logs, populates the world with traffic and \n\
                  pedestrians, and cycles towns and weather on command."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_COCKPIT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_COCKPIT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the ego vehicle
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "CARLA_COCKPIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override CARLA server host from configuration
    #[arg(long, env = "CARLA_HOST")]
    pub host: Option<String>,

    /// Override CARLA server port from configuration
    #[arg(long, env = "CARLA_PORT")]
    pub port: Option<u16>,

    /// Driver name written into every log row (prompted when omitted)
    #[arg(short, long, env = "CARLA_COCKPIT_DRIVER")]
    pub driver: Option<String>,

    /// Scripted input file (TOML) replayed as the input device
    #[arg(short, long, env = "CARLA_COCKPIT_INPUT_SCRIPT")]
    pub input_script: Option<PathBuf>,

    /// Override the recording output directory
    #[arg(short, long, env = "CARLA_COCKPIT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Disable video recording (logs are still written)
    #[arg(long)]
    pub no_record: bool,

    /// Do not echo collisions on stdout
    #[arg(long)]
    pub no_collision_echo: bool,

    /// Override the traffic RNG seed
    #[arg(long, env = "CARLA_COCKPIT_SEED")]
    pub seed: Option<u64>,

    /// Write HUD snapshots (PNG) into this directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Snapshot every Nth presented HUD frame
    #[arg(long, default_value = "60", requires = "snapshot_dir")]
    pub snapshot_every: u64,

    /// Maximum number of control ticks (0 = until quit)
    #[arg(long, default_value = "0", env = "CARLA_COCKPIT_MAX_TICKS")]
    pub max_ticks: u64,

    /// Validate configuration and exit without driving
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "CARLA_COCKPIT_METRICS_PORT")]
    pub metrics_port: u16,

    /// Camera frame rate of the mock simulator (Hz)
    #[cfg(not(feature = "real-carla"))]
    #[arg(long, default_value = "20.0")]
    pub mock_camera_hz: f64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "cockpit.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "cockpit.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed camera information
    #[arg(long)]
    pub cameras: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::parse_from([
            "carla-cockpit",
            "-v",
            "run",
            "--driver",
            "Alice",
            "--input-script",
            "drive.toml",
            "--no-record",
            "--max-ticks",
            "120",
        ]);
        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.driver.as_deref(), Some("Alice"));
        assert!(args.no_record);
        assert_eq!(args.max_ticks, 120);
        assert!(args.config.is_none());
    }
}
