use tracing::{debug, info};

use pickup_core::PickupResult;
use pickup_domain::messaging::{EventBus, Topology};

/// 本次调用实际新建的主题和订阅
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub topics_created: Vec<String>,
    pub subscriptions_created: Vec<String>,
}

impl ProvisionReport {
    pub fn is_noop(&self) -> bool {
        self.topics_created.is_empty() && self.subscriptions_created.is_empty()
    }
}

/// 确保拓扑中的主题和订阅都存在，已存在的跳过
pub async fn provision(bus: &dyn EventBus, topology: &Topology) -> PickupResult<ProvisionReport> {
    let mut report = ProvisionReport::default();

    for topic in &topology.topics {
        if bus.topic_exists(topic).await? {
            debug!("主题 {} 已存在", topic);
            continue;
        }
        bus.create_topic(topic).await?;
        info!("创建主题: {}", topic);
        report.topics_created.push(topic.clone());
    }

    for binding in &topology.bindings {
        if bus.subscription_exists(&binding.subscription).await? {
            debug!("订阅 {} 已存在", binding.subscription);
            continue;
        }
        bus.create_subscription(&binding.subscription, &binding.topic)
            .await?;
        info!(
            "创建订阅: {} -> {} ({})",
            binding.subscription, binding.topic, binding.kind
        );
        report.subscriptions_created.push(binding.subscription.clone());
    }

    Ok(report)
}
