use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::*,
    protocol::{AMQPErrorKind, AMQPSoftError},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ErrorKind, ExchangeKind,
};
use pickup_core::config::MessageQueueConfig;
use pickup_core::logging::mask_url_credentials;
use pickup_core::{PickupError, PickupResult};
use pickup_domain::messaging::{Delivery, EventBus};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// RabbitMQ事件总线实现
///
/// 主题映射为持久化的 fanout 交换机，订阅映射为绑定到交换机的持久化队列。
/// 发布使用独立的确认模式通道，消费者共享另一个通道，确认与拒绝都在该通道上完成。
pub struct RabbitMqEventBus {
    connection: Connection,
    publish_channel: Arc<Mutex<Channel>>,
    consume_channel: Arc<Mutex<Channel>>,
    consumers: Mutex<HashMap<String, Arc<Mutex<Consumer>>>>,
}

impl RabbitMqEventBus {
    pub async fn new(config: &MessageQueueConfig) -> PickupResult<Self> {
        let connect = Connection::connect(&config.url, ConnectionProperties::default());
        let connection =
            tokio::time::timeout(Duration::from_secs(config.connection_timeout_seconds), connect)
                .await
                .map_err(|_| PickupError::MessageQueue("连接RabbitMQ超时".to_string()))?
                .map_err(|e| PickupError::MessageQueue(format!("连接RabbitMQ失败: {e}")))?;

        let publish_channel = connection
            .create_channel()
            .await
            .map_err(|e| PickupError::MessageQueue(format!("创建通道失败: {e}")))?;
        publish_channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| PickupError::MessageQueue(format!("开启发布确认失败: {e}")))?;

        let consume_channel = connection
            .create_channel()
            .await
            .map_err(|e| PickupError::MessageQueue(format!("创建通道失败: {e}")))?;
        consume_channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| PickupError::MessageQueue(format!("设置预取数量失败: {e}")))?;

        info!("成功连接到RabbitMQ: {}", mask_url_credentials(&config.url));

        Ok(Self {
            connection,
            publish_channel: Arc::new(Mutex::new(publish_channel)),
            consume_channel: Arc::new(Mutex::new(consume_channel)),
            consumers: Mutex::new(HashMap::new()),
        })
    }

    /// 被动声明失败会关闭通道，因此探测使用一次性通道
    async fn passive_declare_channel(&self) -> PickupResult<Channel> {
        self.connection
            .create_channel()
            .await
            .map_err(|e| PickupError::MessageQueue(format!("创建通道失败: {e}")))
    }

    /// 被动声明的目标不存在时，服务端以 404 NOT_FOUND 关闭通道
    fn is_not_found(error: &lapin::Error) -> bool {
        match error.kind() {
            ErrorKind::ProtocolError(amqp_error) => is_not_found_kind(amqp_error.kind()),
            _ => false,
        }
    }

    /// 获取订阅对应的消费者，首次调用时创建
    async fn consumer_for(&self, subscription: &str) -> PickupResult<Arc<Mutex<Consumer>>> {
        let mut consumers = self.consumers.lock().await;
        if let Some(consumer) = consumers.get(subscription) {
            return Ok(consumer.clone());
        }

        let channel = self.consume_channel.lock().await;
        let consumer = channel
            .basic_consume(
                subscription,
                &format!("pickup-{subscription}"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                PickupError::MessageQueue(format!("为订阅 {subscription} 创建消费者失败: {e}"))
            })?;

        debug!("为订阅 {} 创建消费者", subscription);
        let consumer = Arc::new(Mutex::new(consumer));
        consumers.insert(subscription.to_string(), consumer.clone());
        Ok(consumer)
    }

}

fn is_not_found_kind(kind: &AMQPErrorKind) -> bool {
    matches!(kind, AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND))
}

#[async_trait]
impl EventBus for RabbitMqEventBus {
    async fn topic_exists(&self, topic: &str) -> PickupResult<bool> {
        let channel = self.passive_declare_channel().await?;
        let result = channel
            .exchange_declare(
                topic,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;

        match result {
            Ok(()) => {
                let _ = channel.close(200, "探测完成").await;
                Ok(true)
            }
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(PickupError::MessageQueue(format!(
                "检查主题 {topic} 失败: {e}"
            ))),
        }
    }

    async fn create_topic(&self, topic: &str) -> PickupResult<()> {
        let channel = self.publish_channel.lock().await;
        channel
            .exchange_declare(
                topic,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| PickupError::MessageQueue(format!("声明主题 {topic} 失败: {e}")))?;

        debug!("主题 {} 声明成功", topic);
        Ok(())
    }

    async fn subscription_exists(&self, subscription: &str) -> PickupResult<bool> {
        let channel = self.passive_declare_channel().await?;
        let result = channel
            .queue_declare(
                subscription,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;

        match result {
            Ok(_) => {
                let _ = channel.close(200, "探测完成").await;
                Ok(true)
            }
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(PickupError::MessageQueue(format!(
                "检查订阅 {subscription} 失败: {e}"
            ))),
        }
    }

    async fn create_subscription(&self, subscription: &str, topic: &str) -> PickupResult<()> {
        let channel = self.publish_channel.lock().await;
        channel
            .queue_declare(
                subscription,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                PickupError::MessageQueue(format!("声明订阅 {subscription} 失败: {e}"))
            })?;

        channel
            .queue_bind(
                subscription,
                topic,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                PickupError::MessageQueue(format!(
                    "绑定订阅 {subscription} 到主题 {topic} 失败: {e}"
                ))
            })?;

        debug!("订阅 {} 已绑定到主题 {}", subscription, topic);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> PickupResult<()> {
        let channel = self.publish_channel.lock().await;
        let confirm = channel
            .basic_publish(
                topic,
                "",
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| PickupError::MessageQueue(format!("发布消息到主题 {topic} 失败: {e}")))?;

        let confirmation = confirm
            .await
            .map_err(|e| PickupError::MessageQueue(format!("消息发布确认失败: {e}")))?;
        if confirmation.is_nack() {
            return Err(PickupError::MessageQueue(format!(
                "主题 {topic} 拒绝了发布的消息"
            )));
        }

        debug!("消息已发布到主题: {}", topic);
        Ok(())
    }

    async fn receive(&self, subscription: &str) -> PickupResult<Delivery> {
        let consumer = self.consumer_for(subscription).await?;
        let mut consumer = consumer.lock().await;

        match consumer.next().await {
            Some(Ok(delivery)) => Ok(Delivery {
                subscription: subscription.to_string(),
                delivery_tag: delivery.delivery_tag,
                payload: delivery.data,
                redelivered: delivery.redelivered,
            }),
            Some(Err(e)) => Err(PickupError::MessageQueue(format!(
                "从订阅 {subscription} 接收消息失败: {e}"
            ))),
            None => {
                warn!("订阅 {} 的消费者已关闭", subscription);
                drop(consumer);
                self.consumers.lock().await.remove(subscription);
                Err(PickupError::MessageQueue(format!(
                    "订阅 {subscription} 的消费者已关闭"
                )))
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> PickupResult<()> {
        let channel = self.consume_channel.lock().await;
        channel
            .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| PickupError::MessageQueue(format!("确认消息失败: {e}")))
    }

    async fn nack(&self, delivery: &Delivery) -> PickupResult<()> {
        let channel = self.consume_channel.lock().await;
        channel
            .basic_nack(
                delivery.delivery_tag,
                BasicNackOptions {
                    multiple: false,
                    requeue: true,
                },
            )
            .await
            .map_err(|e| PickupError::MessageQueue(format!("拒绝消息失败: {e}")))
    }

    async fn close(&self) -> PickupResult<()> {
        if !self.connection.status().connected() {
            return Ok(());
        }

        self.consumers.lock().await.clear();
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| PickupError::MessageQueue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}
