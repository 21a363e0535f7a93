//! 消息总线抽象
//!
//! 主题为扇出语义：一条发布的消息会复制到该主题下的每个订阅。
//! 同一订阅内消息只交付给一个消费者，确认后移除，拒绝后重新投递。

use async_trait::async_trait;
use pickup_core::config::MessageQueueConfig;
use pickup_core::PickupResult;

use crate::events::LifecycleEventKind;

/// 从订阅中取出的一条待确认消息
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub subscription: String,
    pub delivery_tag: u64,
    pub payload: Vec<u8>,
    pub redelivered: bool,
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn topic_exists(&self, topic: &str) -> PickupResult<bool>;
    async fn create_topic(&self, topic: &str) -> PickupResult<()>;
    async fn subscription_exists(&self, subscription: &str) -> PickupResult<bool>;
    async fn create_subscription(&self, subscription: &str, topic: &str) -> PickupResult<()>;

    /// 发布并等待总线确认
    async fn publish(&self, topic: &str, payload: &[u8]) -> PickupResult<()>;

    /// 阻塞直到订阅上有可用消息
    async fn receive(&self, subscription: &str) -> PickupResult<Delivery>;
    async fn ack(&self, delivery: &Delivery) -> PickupResult<()>;

    /// 拒绝并重新入队
    async fn nack(&self, delivery: &Delivery) -> PickupResult<()>;

    /// 释放底层连接，之后不应再调用其他方法
    async fn close(&self) -> PickupResult<()> {
        Ok(())
    }
}

/// 订阅与事件类型、主题的绑定关系
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionBinding {
    pub kind: LifecycleEventKind,
    pub topic: String,
    pub subscription: String,
}

/// 启动时需要存在的全部主题和订阅
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub topics: Vec<String>,
    pub bindings: Vec<SubscriptionBinding>,
}

impl Topology {
    pub fn from_config(config: &MessageQueueConfig) -> Self {
        let topics = config.topics.all().iter().map(|t| t.to_string()).collect();
        let bindings = LifecycleEventKind::ALL
            .iter()
            .map(|kind| SubscriptionBinding {
                kind: *kind,
                topic: kind.topic(&config.topics).to_string(),
                subscription: kind.subscription(&config.subscriptions).to_string(),
            })
            .collect();
        Self { topics, bindings }
    }

    pub fn binding_for(&self, kind: LifecycleEventKind) -> Option<&SubscriptionBinding> {
        self.bindings.iter().find(|binding| binding.kind == kind)
    }
}
