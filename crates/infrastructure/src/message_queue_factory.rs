use std::sync::Arc;

use pickup_core::config::{MessageQueueConfig, MessageQueueType};
use pickup_core::PickupResult;
use pickup_domain::messaging::EventBus;
use tracing::{debug, info};

use crate::{InMemoryEventBus, RabbitMqEventBus};

pub struct MessageQueueFactory;

impl MessageQueueFactory {
    pub async fn create(config: &MessageQueueConfig) -> PickupResult<Arc<dyn EventBus>> {
        debug!("创建事件总线，类型: {:?}", config.r#type);

        match config.r#type {
            MessageQueueType::Rabbitmq => {
                info!("初始化RabbitMQ事件总线");
                let bus = RabbitMqEventBus::new(config).await?;
                Ok(Arc::new(bus))
            }
            MessageQueueType::InMemory => {
                info!("初始化内存事件总线");
                Ok(Arc::new(InMemoryEventBus::new()))
            }
        }
    }
}
