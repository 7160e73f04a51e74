//! # stereo-odom
//!
//! 双目视觉里程计命令行入口：加载配置、驱动流水线、处理退出信号。

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::LogConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // .env 可选
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_logging(&LogConfig::from_verbosity(
        cli.verbose,
        cli.quiet,
        cli.log_format.clone().into(),
    ))?;

    info!(version = env!("CARGO_PKG_VERSION"), "stereo-odom starting");

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
