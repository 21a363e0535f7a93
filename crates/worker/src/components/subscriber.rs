use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use pickup_domain::events::LifecycleEventKind;
use pickup_domain::messaging::{Delivery, EventBus};

use crate::handlers::{HandleOutcome, LifecycleEventHandler};

/// 单个订阅的接收循环
///
/// 关闭信号只在等待消息时生效，正在处理的消息会完成确认后再退出。
pub struct EventSubscriber {
    kind: LifecycleEventKind,
    subscription: String,
    bus: Arc<dyn EventBus>,
    handler: Arc<LifecycleEventHandler>,
    retry_delay: Duration,
}

impl EventSubscriber {
    pub fn new(
        kind: LifecycleEventKind,
        subscription: String,
        bus: Arc<dyn EventBus>,
        handler: Arc<LifecycleEventHandler>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            kind,
            subscription,
            bus,
            handler,
            retry_delay,
        }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("订阅者 {} ({}) 开始接收消息", self.subscription, self.kind);

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    break;
                }
                received = self.bus.receive(&self.subscription) => received,
            };

            match received {
                Ok(delivery) => self.process(delivery).await,
                Err(e) => {
                    error!("订阅 {} 接收消息失败: {}", self.subscription, e);
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        info!("订阅者 {} 已停止", self.subscription);
    }

    async fn process(&self, delivery: Delivery) {
        if delivery.redelivered {
            debug!(
                "订阅 {} 收到重投消息 {}",
                self.subscription, delivery.delivery_tag
            );
        }

        match self.handler.handle(self.kind, &delivery.payload).await {
            HandleOutcome::Processed => {
                counter!("pickup_events_processed_total", "kind" => self.kind.name()).increment(1);
                if let Err(e) = self.bus.ack(&delivery).await {
                    error!("订阅 {} 确认消息失败: {}", self.subscription, e);
                }
            }
            HandleOutcome::Retry(reason) => {
                counter!("pickup_events_retried_total", "kind" => self.kind.name()).increment(1);
                warn!(
                    "订阅 {} 处理消息失败，拒绝并等待重投: {}",
                    self.subscription, reason
                );
                if let Err(e) = self.bus.nack(&delivery).await {
                    error!("订阅 {} 拒绝消息失败: {}", self.subscription, e);
                }
            }
        }
    }
}
