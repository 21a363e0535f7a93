use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use pickup_core::{PickupError, PickupResult};
use pickup_domain::notification::{EmailRecipient, EmailTransport};

/// 通知分发器
///
/// 无状态，不做重试。重试只通过订阅者拒绝消息、总线重新投递来实现。
pub struct NotificationDispatcher {
    transport: Arc<dyn EmailTransport>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self { transport }
    }

    pub async fn deliver(
        &self,
        recipient: &dyn EmailRecipient,
        subject: &str,
        body: &str,
    ) -> PickupResult<()> {
        let address = recipient.email();
        if address.trim().is_empty() {
            return Err(PickupError::Notification(format!(
                "{} 没有邮箱地址",
                recipient.display_name()
            )));
        }

        match self.transport.send(address, subject, body).await {
            Ok(()) => {
                counter!("pickup_notifications_sent_total").increment(1);
                debug!("通知已发送给 {}: {}", address, subject);
                Ok(())
            }
            Err(e) => {
                counter!("pickup_notifications_failed_total").increment(1);
                warn!("发送通知给 {} 失败: {}", address, e);
                Err(e)
            }
        }
    }
}
