use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Barrier, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use pickup_core::{PickupError, PickupResult};
use pickup_domain::messaging::{EventBus, Topology};

use super::shutdown::ShutdownManager;
use super::subscriber::EventSubscriber;
use crate::handlers::LifecycleEventHandler;

/// 订阅者监管
///
/// 为拓扑中的每个订阅启动一个独立任务，关闭时广播信号并等待全部退出。
pub struct ListenerSupervisor {
    bus: Arc<dyn EventBus>,
    handler: Arc<LifecycleEventHandler>,
    topology: Topology,
    retry_delay: Duration,
    shutdown: ShutdownManager,
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl ListenerSupervisor {
    pub fn new(
        bus: Arc<dyn EventBus>,
        handler: Arc<LifecycleEventHandler>,
        topology: Topology,
        retry_delay: Duration,
        shutdown: ShutdownManager,
    ) -> Self {
        Self {
            bus,
            handler,
            topology,
            retry_delay,
            shutdown,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// 启动全部订阅者，所有任务都进入接收循环后返回
    pub async fn start(&self) -> PickupResult<()> {
        let mut handles = self.handles.lock().await;
        if !handles.is_empty() {
            return Err(PickupError::Internal("订阅者已经在运行".to_string()));
        }

        let barrier = Arc::new(Barrier::new(self.topology.bindings.len() + 1));
        for binding in &self.topology.bindings {
            let subscriber = EventSubscriber::new(
                binding.kind,
                binding.subscription.clone(),
                Arc::clone(&self.bus),
                Arc::clone(&self.handler),
                self.retry_delay,
            );
            let shutdown_rx = self.shutdown.subscribe().await;
            let barrier = Arc::clone(&barrier);

            let handle = tokio::spawn(async move {
                barrier.wait().await;
                subscriber.run(shutdown_rx).await;
            });
            handles.push((binding.subscription.clone(), handle));
        }
        barrier.wait().await;

        info!("已启动 {} 个订阅者", handles.len());
        Ok(())
    }

    pub async fn running_count(&self) -> usize {
        self.handles
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .count()
    }

    /// 发送关闭信号并等待所有订阅者退出，超时未退出的任务会被中止
    pub async fn shutdown(&self, timeout: Duration) -> PickupResult<()> {
        self.shutdown.shutdown().await;

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut stuck = Vec::new();

        for (subscription, mut handle) in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("订阅者 {} 异常退出: {}", subscription, e),
                Err(_) => {
                    warn!("订阅者 {} 未能在超时内退出，强制中止", subscription);
                    handle.abort();
                    stuck.push(subscription);
                }
            }
        }

        if !stuck.is_empty() {
            return Err(PickupError::Internal(format!(
                "{} 个订阅者未能在超时内退出: {}",
                stuck.len(),
                stuck.join(", ")
            )));
        }

        info!("所有订阅者已退出");
        Ok(())
    }
}
