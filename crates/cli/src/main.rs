//! # biosync CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 会话配置加载与验证
//! - 通过同步引擎运行模拟采集
//! - 优雅关闭处理

mod cli;
mod commands;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_simulate, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "biosync starting");

    let result = match &cli.command {
        Commands::Simulate(args) => run_simulate(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
///
/// Metrics are installed per command, so the exporter stays off here.
fn init_logging(cli: &Cli) -> Result<()> {
    let config = ObservabilityConfig::default()
        .with_format(cli.log_format.into())
        .with_verbosity(cli.verbose, u8::from(cli.quiet))
        .with_metrics_port(None);

    observability::init_with_config(config)
}
