use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info};

use pickup_core::config::AppConfig;
use pickup_dispatcher::{provision, PickupRequestCommands, ProvisionReport};
use pickup_domain::messaging::{EventBus, Topology};
use pickup_domain::notification::EmailTransport;
use pickup_domain::repositories::EntityStore;
use pickup_infrastructure::{create_email_transport, DatabaseManager, MessageQueueFactory};
use pickup_worker::{
    LifecycleEventHandler, ListenerSupervisor, NotificationDispatcher, ShutdownManager,
};

/// 主应用程序
///
/// 持有存储、事件总线和通知通道，对外提供命令处理器和订阅者监管。
pub struct Application {
    config: AppConfig,
    topology: Topology,
    bus: Arc<dyn EventBus>,
    commands: PickupRequestCommands,
    supervisor: ListenerSupervisor,
    database: Option<DatabaseManager>,
}

impl Application {
    /// 按配置连接数据库、消息队列并创建邮件通道
    pub async fn new(config: AppConfig) -> Result<Self> {
        let database = DatabaseManager::new(&config.database)
            .await
            .context("初始化数据库失败")?;
        let store: Arc<dyn EntityStore> = Arc::new(database.entity_store());

        let bus = MessageQueueFactory::create(&config.message_queue)
            .await
            .context("创建消息队列失败")?;

        let transport =
            create_email_transport(&config.notification).context("创建邮件通道失败")?;

        let mut app = Self::from_parts(config, store, bus, transport);
        app.database = Some(database);
        Ok(app)
    }

    /// 由已经构造好的组件组装应用
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn EntityStore>,
        bus: Arc<dyn EventBus>,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        let topology = Topology::from_config(&config.message_queue);

        let commands = PickupRequestCommands::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            config.message_queue.topics.clone(),
        );

        let notifier = Arc::new(NotificationDispatcher::new(transport));
        let handler = Arc::new(LifecycleEventHandler::new(
            store,
            notifier,
            config.notification.signature.clone(),
        ));
        let supervisor = ListenerSupervisor::new(
            Arc::clone(&bus),
            handler,
            topology.clone(),
            Duration::from_millis(config.listener.receive_retry_delay_ms),
            ShutdownManager::new(),
        );

        Self {
            config,
            topology,
            bus,
            commands,
            supervisor,
            database: None,
        }
    }

    pub fn commands(&self) -> &PickupRequestCommands {
        &self.commands
    }

    pub fn supervisor(&self) -> &ListenerSupervisor {
        &self.supervisor
    }

    /// 确保所有主题和订阅存在
    pub async fn provision(&self) -> Result<ProvisionReport> {
        let report = provision(self.bus.as_ref(), &self.topology)
            .await
            .context("创建主题和订阅失败")?;
        if report.is_noop() {
            info!("主题和订阅均已存在");
        } else {
            info!(
                "新建了 {} 个主题和 {} 个订阅",
                report.topics_created.len(),
                report.subscriptions_created.len()
            );
        }
        Ok(report)
    }

    /// 启动订阅者，直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.provision().await?;
        self.supervisor
            .start()
            .await
            .context("启动订阅者失败")?;
        info!("取件请求协调器已启动");

        let _ = shutdown_rx.recv().await;
        info!("收到关闭信号，停止订阅者");

        let timeout = Duration::from_secs(self.config.listener.shutdown_timeout_seconds);
        let result = self.supervisor.shutdown(timeout).await;
        self.close().await;

        if let Err(e) = &result {
            error!("订阅者关闭不完整: {}", e);
        }
        result.context("关闭订阅者失败")
    }

    /// 关闭事件总线连接和数据库连接池
    pub async fn close(&self) {
        if let Err(e) = self.bus.close().await {
            error!("关闭事件总线失败: {}", e);
        }
        if let Some(database) = &self.database {
            database.close().await;
        }
    }
}
