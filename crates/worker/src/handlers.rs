use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use pickup_domain::entities::{Business, Collector, PickupRequest};
use pickup_domain::events::LifecycleEventKind;
use pickup_domain::notification::EmailRecipient;
use pickup_domain::repositories::EntityStore;

use crate::notifier::NotificationDispatcher;
use crate::templates::{audiences, render, Audience};

/// 订阅者处理单条消息时的失败，只影响确认结果，不返回给任何调用方
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("消息反序列化失败: {0}")]
    Deserialization(String),

    #[error("关联实体查询失败: {0}")]
    Lookup(String),

    #[error("通知发送失败: {0}")]
    Dispatch(String),
}

/// 单条消息的处理结果，由传输层转换为 ack 或 nack
#[derive(Debug)]
pub enum HandleOutcome {
    Processed,
    Retry(ConsumerError),
}

impl HandleOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, HandleOutcome::Processed)
    }
}

/// 生命周期事件处理器
///
/// 与传输无关：输入事件类型和原始载荷，输出处理结果。
pub struct LifecycleEventHandler {
    store: Arc<dyn EntityStore>,
    notifier: Arc<NotificationDispatcher>,
    signature: String,
}

impl LifecycleEventHandler {
    pub fn new(
        store: Arc<dyn EntityStore>,
        notifier: Arc<NotificationDispatcher>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            signature: signature.into(),
        }
    }

    pub async fn handle(&self, kind: LifecycleEventKind, payload: &[u8]) -> HandleOutcome {
        match self.try_handle(kind, payload).await {
            Ok(()) => HandleOutcome::Processed,
            Err(e) => HandleOutcome::Retry(e),
        }
    }

    async fn try_handle(
        &self,
        kind: LifecycleEventKind,
        payload: &[u8],
    ) -> Result<(), ConsumerError> {
        let request = PickupRequest::from_payload(payload)
            .map_err(|e| ConsumerError::Deserialization(e.to_string()))?;
        debug!("处理 {} 事件: 取件请求 {}", kind, request.request_id);

        let (collector, business) = self.resolve_parties(&request).await?;

        // 前面的收件人已经收到邮件时后面失败，重投后会再收到一次
        for audience in audiences(kind) {
            let recipient: &dyn EmailRecipient = match audience {
                Audience::Collector => &collector,
                Audience::Business => &business,
            };
            let notice = render(kind, *audience, &request, &collector, &self.signature);
            self.notifier
                .deliver(recipient, &notice.subject, &notice.body)
                .await
                .map_err(|e| ConsumerError::Dispatch(e.to_string()))?;
            info!(
                "{} 通知已发送给 {}: {}",
                kind,
                recipient.display_name(),
                recipient.email()
            );
        }

        Ok(())
    }

    async fn resolve_parties(
        &self,
        request: &PickupRequest,
    ) -> Result<(Collector, Business), ConsumerError> {
        let collector = self
            .store
            .get_collector_by_id(request.collector_id)
            .await
            .map_err(|e| ConsumerError::Lookup(e.to_string()))?
            .ok_or_else(|| {
                ConsumerError::Lookup(format!("收运商 {} 不存在", request.collector_id))
            })?;

        let business = self
            .store
            .get_business_by_id(request.business_id)
            .await
            .map_err(|e| ConsumerError::Lookup(e.to_string()))?
            .ok_or_else(|| {
                ConsumerError::Lookup(format!("商户 {} 不存在", request.business_id))
            })?;

        Ok((collector, business))
    }
}
