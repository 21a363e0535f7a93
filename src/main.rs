use anyhow::{Context, Result};
use clap::Parser;

use pickup_coordinator::CliApp;
use pickup_core::config::AppConfig;
use pickup_core::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliApp::parse();

    // 加载配置
    let mut config = AppConfig::load(cli.config.as_deref()).context("加载配置失败")?;
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }

    // 初始化日志系统
    init_logging(&config.observability)?;
    tracing::info!("启动取件请求协调器");

    cli.run(config).await
}
