//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stereo Odom - stereo visual odometry pose integration pipeline
#[derive(Parser, Debug)]
#[command(
    name = "stereo-odom",
    author,
    version,
    about = "Stereo visual odometry pipeline",
    long_about = "Integrates frame-to-frame stereo motion estimates into an odometry pose.\n\n\
                  Reads stereo pairs from a mock generator or a recorded sequence, \n\
                  expresses the pose in the robot base frame, and dispatches odometry, \n\
                  pose and transform records to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STEREO_ODOM_VERBOSE")]
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
        env = "STEREO_ODOM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the odometry pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "STEREO_ODOM_CONFIG"
    )]
    pub config: PathBuf,

    /// Override whether the odom -> base_link transform is published
    #[arg(long, action = clap::ArgAction::Set, env = "STEREO_ODOM_PUBLISH_TF")]
    pub publish_tf: Option<bool>,

    /// Override the odometry frame name
    #[arg(long)]
    pub odom_frame: Option<String>,

    /// Override the robot base frame name
    #[arg(long)]
    pub base_link_frame: Option<String>,

    /// Override the camera frame name
    #[arg(long)]
    pub sensor_frame: Option<String>,

    /// Maximum number of stereo frames to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "STEREO_ODOM_MAX_FRAMES")]
    pub max_frames: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STEREO_ODOM_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between odometer and dispatcher
    #[arg(long, default_value = "100", env = "STEREO_ODOM_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STEREO_ODOM_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show static transforms
    #[arg(long)]
    pub transforms: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
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
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
