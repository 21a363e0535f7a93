use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use clap::Subcommand;
use tokio::signal;
use tracing::{error, info, warn};

use pickup_core::config::AppConfig;
use pickup_domain::entities::{DriverAssignment, NewPickupRequest, PickupRequest, DATETIME_FORMAT};
use pickup_worker::ShutdownManager;

use crate::app::Application;

/// 取件请求协调器
#[derive(clap::Parser, Debug)]
#[command(name = "pickup")]
#[command(version = "1.0.0")]
#[command(about = "废弃物收运平台 - 取件请求生命周期协调器")]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// 配置文件路径，未指定时按默认路径查找
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// 覆盖配置中的日志级别
    #[arg(short, long, global = true, value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// 创建主题和订阅并启动全部订阅者 (默认)
    Serve,
    /// 只创建主题和订阅
    Provision,
    /// 创建取件请求
    Create {
        /// 商户用户ID
        #[arg(long)]
        business: i64,
        /// 收运商用户ID
        #[arg(long)]
        collector: i64,
        /// 废弃物类型
        #[arg(long)]
        waste_type: String,
        /// 数量
        #[arg(long)]
        quantity: f64,
        /// 取件时间 (YYYY-MM-DD HH:MM:SS)
        #[arg(long, value_parser = parse_datetime)]
        pickup_date: NaiveDateTime,
        /// 处理要求
        #[arg(long, default_value = "")]
        handling_requirements: String,
    },
    /// 接受取件请求
    Accept { request_id: i64 },
    /// 拒绝取件请求
    Reject { request_id: i64 },
    /// 为取件请求指派司机和车辆
    Assign {
        request_id: i64,
        #[arg(long)]
        driver: i64,
        #[arg(long)]
        vehicle: i64,
    },
    /// 取消司机指派
    Unassign { request_id: i64 },
    /// 开始配送
    StartDelivery { request_id: i64 },
    /// 结束配送
    EndDelivery { request_id: i64 },
    /// 查看取件请求
    Show { request_id: i64 },
}

fn parse_datetime(value: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|e| format!("时间格式应为 YYYY-MM-DD HH:MM:SS: {e}"))
}

impl CliApp {
    pub async fn run(self, config: AppConfig) -> Result<()> {
        let command = self.command.unwrap_or(Commands::Serve);
        let app = Application::new(config.clone()).await?;

        let result = match command {
            Commands::Serve => {
                return serve(app, &config).await;
            }
            Commands::Provision => {
                let report = app.provision().await?;
                println!(
                    "主题: 新建 {} 个, 订阅: 新建 {} 个",
                    report.topics_created.len(),
                    report.subscriptions_created.len()
                );
                Ok(())
            }
            Commands::Create {
                business,
                collector,
                waste_type,
                quantity,
                pickup_date,
                handling_requirements,
            } => {
                let request_id = app
                    .commands()
                    .create_pickup_request(NewPickupRequest {
                        business_id: business,
                        collector_id: collector,
                        waste_type,
                        quantity,
                        pickup_date,
                        handling_requirements,
                    })
                    .await?;
                println!("取件请求已创建: {request_id}");
                Ok(())
            }
            Commands::Accept { request_id } => {
                print_request(&app.commands().accept_pickup_request(request_id).await?)
            }
            Commands::Reject { request_id } => {
                print_request(&app.commands().reject_pickup_request(request_id).await?)
            }
            Commands::Assign {
                request_id,
                driver,
                vehicle,
            } => print_request(
                &app.commands()
                    .assign_trip_to_driver(
                        request_id,
                        DriverAssignment {
                            driver_id: driver,
                            vehicle_id: vehicle,
                        },
                    )
                    .await?,
            ),
            Commands::Unassign { request_id } => {
                print_request(&app.commands().unassign_trip_from_driver(request_id).await?)
            }
            Commands::StartDelivery { request_id } => {
                print_request(&app.commands().start_delivery(request_id).await?)
            }
            Commands::EndDelivery { request_id } => {
                print_request(&app.commands().end_delivery(request_id).await?)
            }
            Commands::Show { request_id } => {
                print_request(&app.commands().get_pickup_request(request_id).await?)
            }
        };

        app.close().await;
        result
    }
}

fn print_request(request: &PickupRequest) -> Result<()> {
    let rendered = serde_json::to_string_pretty(request).context("序列化取件请求失败")?;
    println!("{rendered}");
    Ok(())
}

async fn serve(app: Application, config: &AppConfig) -> Result<()> {
    serve_until(app, config, wait_for_shutdown_signal()).await
}

/// 运行应用直到关闭信号到达，应用提前退出时返回它的错误
async fn serve_until<F>(app: Application, config: &AppConfig, shutdown_signal: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let app = Arc::new(app);
        let shutdown_rx = shutdown_manager.subscribe().await;
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::select! {
        joined = &mut app_handle => {
            return match joined {
                Ok(Ok(())) => Err(anyhow!("应用在收到关闭信号前退出")),
                Ok(Err(e)) => {
                    error!("应用运行失败: {e:#}");
                    Err(e)
                }
                Err(e) => Err(anyhow!(e).context("应用任务异常终止")),
            };
        }
        _ = shutdown_signal => {
            info!("收到关闭信号，开始优雅关闭...");
        }
    }

    shutdown_manager.shutdown().await;

    // 订阅者自身的超时之外再留出关闭连接的时间
    let grace = Duration::from_secs(config.listener.shutdown_timeout_seconds + 5);
    match tokio::time::timeout(grace, app_handle).await {
        Ok(Ok(Ok(()))) => info!("应用已优雅关闭"),
        Ok(Ok(Err(e))) => error!("应用关闭时发生错误: {e:#}"),
        Ok(Err(e)) => error!("应用任务异常终止: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }
    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
