use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pickup_core::{PickupError, PickupResult};
use pickup_domain::messaging::{Delivery, EventBus};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

/// 内存事件总线
///
/// 进程内实现，适用于嵌入式运行和测试。主题扇出到绑定的每个订阅，
/// 订阅内的消息交付后进入待确认集合，拒绝时带着重投标记回到队首。
#[derive(Default)]
pub struct InMemoryEventBus {
    state: Mutex<BusState>,
    signals: Mutex<HashMap<String, Arc<Notify>>>,
    next_tag: AtomicU64,
    closed: AtomicBool,
}

#[derive(Default)]
struct BusState {
    topics: HashSet<String>,
    /// 主题 -> 绑定的订阅
    bindings: HashMap<String, Vec<String>>,
    subscriptions: HashMap<String, SubscriptionQueue>,
    published: Vec<PublishedMessage>,
}

#[derive(Default)]
struct SubscriptionQueue {
    ready: VecDeque<QueuedMessage>,
    in_flight: HashMap<u64, QueuedMessage>,
}

#[derive(Clone)]
struct QueuedMessage {
    payload: Vec<u8>,
    redelivered: bool,
}

/// 发布日志中的一条记录
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        info!("创建内存事件总线");
        Self::default()
    }

    async fn signal_for(&self, subscription: &str) -> Arc<Notify> {
        let mut signals = self.signals.lock().await;
        signals
            .entry(subscription.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// 按发布顺序返回所有已发布的消息
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().await.published.clone()
    }

    /// 订阅中尚未交付的消息数
    pub async fn pending_count(&self, subscription: &str) -> usize {
        let state = self.state.lock().await;
        state
            .subscriptions
            .get(subscription)
            .map(|queue| queue.ready.len())
            .unwrap_or(0)
    }

    /// 已交付但未确认的消息数
    pub async fn in_flight_count(&self, subscription: &str) -> usize {
        let state = self.state.lock().await;
        state
            .subscriptions
            .get(subscription)
            .map(|queue| queue.in_flight.len())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> PickupResult<()> {
        if self.is_closed() {
            return Err(PickupError::MessageQueue("事件总线已关闭".to_string()));
        }
        Ok(())
    }

    /// 订阅中没有待交付也没有待确认的消息
    pub async fn is_drained(&self, subscription: &str) -> bool {
        self.pending_count(subscription).await == 0 && self.in_flight_count(subscription).await == 0
    }

    async fn settle(&self, delivery: &Delivery, requeue: bool) -> PickupResult<()> {
        let mut state = self.state.lock().await;
        let queue = state
            .subscriptions
            .get_mut(&delivery.subscription)
            .ok_or_else(|| {
                PickupError::MessageQueue(format!("订阅 {} 不存在", delivery.subscription))
            })?;

        let message = queue.in_flight.remove(&delivery.delivery_tag).ok_or_else(|| {
            PickupError::MessageQueue(format!(
                "订阅 {} 中没有待确认的消息 {}",
                delivery.subscription, delivery.delivery_tag
            ))
        })?;

        if requeue {
            queue.ready.push_front(QueuedMessage {
                payload: message.payload,
                redelivered: true,
            });
            drop(state);
            self.signal_for(&delivery.subscription).await.notify_one();
        }
        Ok(())
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn topic_exists(&self, topic: &str) -> PickupResult<bool> {
        Ok(self.state.lock().await.topics.contains(topic))
    }

    async fn create_topic(&self, topic: &str) -> PickupResult<()> {
        let mut state = self.state.lock().await;
        state.topics.insert(topic.to_string());
        state.bindings.entry(topic.to_string()).or_default();
        debug!("主题 {} 已创建", topic);
        Ok(())
    }

    async fn subscription_exists(&self, subscription: &str) -> PickupResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .contains_key(subscription))
    }

    async fn create_subscription(&self, subscription: &str, topic: &str) -> PickupResult<()> {
        let mut state = self.state.lock().await;
        if !state.topics.contains(topic) {
            return Err(PickupError::MessageQueue(format!("主题 {topic} 不存在")));
        }

        state
            .subscriptions
            .entry(subscription.to_string())
            .or_default();
        let bound = state.bindings.entry(topic.to_string()).or_default();
        if !bound.iter().any(|s| s == subscription) {
            bound.push(subscription.to_string());
        }
        debug!("订阅 {} 已绑定到主题 {}", subscription, topic);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> PickupResult<()> {
        self.ensure_open()?;
        let targets = {
            let mut state = self.state.lock().await;
            if !state.topics.contains(topic) {
                return Err(PickupError::MessageQueue(format!("主题 {topic} 不存在")));
            }

            let targets = state.bindings.get(topic).cloned().unwrap_or_default();
            for subscription in &targets {
                if let Some(queue) = state.subscriptions.get_mut(subscription) {
                    queue.ready.push_back(QueuedMessage {
                        payload: payload.to_vec(),
                        redelivered: false,
                    });
                }
            }
            state.published.push(PublishedMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            });
            targets
        };

        for subscription in &targets {
            self.signal_for(subscription).await.notify_one();
        }
        debug!("消息已发布到主题: {}", topic);
        Ok(())
    }

    async fn receive(&self, subscription: &str) -> PickupResult<Delivery> {
        let signal = self.signal_for(subscription).await;
        loop {
            self.ensure_open()?;
            {
                let mut state = self.state.lock().await;
                let queue = state.subscriptions.get_mut(subscription).ok_or_else(|| {
                    PickupError::MessageQueue(format!("订阅 {subscription} 不存在"))
                })?;

                if let Some(message) = queue.ready.pop_front() {
                    let delivery_tag = self.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
                    let delivery = Delivery {
                        subscription: subscription.to_string(),
                        delivery_tag,
                        payload: message.payload.clone(),
                        redelivered: message.redelivered,
                    };
                    queue.in_flight.insert(delivery_tag, message);
                    return Ok(delivery);
                }
            }
            signal.notified().await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> PickupResult<()> {
        self.settle(delivery, false).await
    }

    async fn nack(&self, delivery: &Delivery) -> PickupResult<()> {
        self.settle(delivery, true).await
    }

    async fn close(&self) -> PickupResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        // 唤醒阻塞在 receive 上的调用方
        for signal in self.signals.lock().await.values() {
            signal.notify_one();
        }
        info!("内存事件总线已关闭");
        Ok(())
    }
}
