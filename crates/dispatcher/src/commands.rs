use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, info, warn};

use pickup_core::config::TopicsConfig;
use pickup_core::{PickupError, PickupResult};
use pickup_domain::entities::{DriverAssignment, NewPickupRequest, PickupRequest, PickupStatus};
use pickup_domain::events::LifecycleEventKind;
use pickup_domain::messaging::EventBus;
use pickup_domain::repositories::EntityStore;

/// 取件请求生命周期命令
///
/// 每个命令先写存储，再把写入后的完整请求发布到对应主题，
/// 两步都完成后才返回。写入成功但发布失败时返回 `PickupError::Publish`，
/// 已写入的数据不会回滚。
pub struct PickupRequestCommands {
    store: Arc<dyn EntityStore>,
    bus: Arc<dyn EventBus>,
    topics: TopicsConfig,
}

impl PickupRequestCommands {
    pub fn new(store: Arc<dyn EntityStore>, bus: Arc<dyn EventBus>, topics: TopicsConfig) -> Self {
        Self { store, bus, topics }
    }

    /// 校验双方存在后创建请求，返回新请求ID
    pub async fn create_pickup_request(&self, request: NewPickupRequest) -> PickupResult<i64> {
        if self
            .store
            .get_business_by_id(request.business_id)
            .await?
            .is_none()
        {
            warn!("创建取件请求失败，商户不存在: {}", request.business_id);
            return Err(PickupError::Validation {
                entity: "商户",
                id: request.business_id,
            });
        }
        if self
            .store
            .get_collector_by_id(request.collector_id)
            .await?
            .is_none()
        {
            warn!("创建取件请求失败，收运商不存在: {}", request.collector_id);
            return Err(PickupError::Validation {
                entity: "收运商",
                id: request.collector_id,
            });
        }

        let request_id = self.store.create_pickup_request(&request).await?;
        let created = self.reload(request_id).await?;
        self.publish_snapshot(LifecycleEventKind::RequestCreated, &created)
            .await?;

        counter!("pickup_commands_total", "command" => "create").increment(1);
        info!(
            "取件请求 {} 已创建: 商户 {} -> 收运商 {}",
            request_id, created.business_id, created.collector_id
        );
        Ok(request_id)
    }

    pub async fn accept_pickup_request(&self, request_id: i64) -> PickupResult<PickupRequest> {
        self.transition_status(
            request_id,
            PickupStatus::Accepted,
            LifecycleEventKind::RequestAccepted,
        )
        .await
    }

    pub async fn reject_pickup_request(&self, request_id: i64) -> PickupResult<PickupRequest> {
        self.transition_status(
            request_id,
            PickupStatus::Rejected,
            LifecycleEventKind::RequestRejected,
        )
        .await
    }

    /// 绑定司机和车辆，状态置为已分配
    pub async fn assign_trip_to_driver(
        &self,
        request_id: i64,
        assignment: DriverAssignment,
    ) -> PickupResult<PickupRequest> {
        self.require_existing(request_id).await?;
        if !self.store.assign_driver(request_id, assignment).await? {
            return Err(PickupError::PickupRequestNotFound { id: request_id });
        }

        let updated = self.reload(request_id).await?;
        self.publish_snapshot(LifecycleEventKind::AssignmentMade, &updated)
            .await?;

        counter!("pickup_commands_total", "command" => "assign_driver").increment(1);
        info!(
            "取件请求 {} 已分配司机 {} 车辆 {}",
            request_id, assignment.driver_id, assignment.vehicle_id
        );
        Ok(updated)
    }

    /// 只清除司机，车辆和状态保持原样
    pub async fn unassign_trip_from_driver(&self, request_id: i64) -> PickupResult<PickupRequest> {
        self.require_existing(request_id).await?;
        if !self.store.clear_assigned_driver(request_id).await? {
            return Err(PickupError::PickupRequestNotFound { id: request_id });
        }

        let updated = self.reload(request_id).await?;
        self.publish_snapshot(LifecycleEventKind::AssignmentCleared, &updated)
            .await?;

        counter!("pickup_commands_total", "command" => "unassign_driver").increment(1);
        info!("取件请求 {} 已取消司机分配", request_id);
        Ok(updated)
    }

    /// 重新发布当前快照，不修改状态
    pub async fn start_delivery(&self, request_id: i64) -> PickupResult<PickupRequest> {
        let current = self.require_existing(request_id).await?;
        self.publish_snapshot(LifecycleEventKind::DeliveryStarted, &current)
            .await?;

        counter!("pickup_commands_total", "command" => "start_delivery").increment(1);
        info!("取件请求 {} 开始配送", request_id);
        Ok(current)
    }

    pub async fn end_delivery(&self, request_id: i64) -> PickupResult<PickupRequest> {
        self.transition_status(
            request_id,
            PickupStatus::Completed,
            LifecycleEventKind::DeliveryEnded,
        )
        .await
    }

    pub async fn get_pickup_request(&self, request_id: i64) -> PickupResult<PickupRequest> {
        self.require_existing(request_id).await
    }

    async fn transition_status(
        &self,
        request_id: i64,
        status: PickupStatus,
        kind: LifecycleEventKind,
    ) -> PickupResult<PickupRequest> {
        let current = self.require_existing(request_id).await?;
        if current.status.is_terminal() {
            debug!(
                "取件请求 {} 已处于终态 {}，仍然写入 {}",
                request_id, current.status, status
            );
        }

        if !self
            .store
            .update_pickup_request_status(request_id, status)
            .await?
        {
            return Err(PickupError::PickupRequestNotFound { id: request_id });
        }

        let updated = self.reload(request_id).await?;
        self.publish_snapshot(kind, &updated).await?;

        counter!("pickup_commands_total", "command" => kind.name()).increment(1);
        info!("取件请求 {} 状态更新为 {}", request_id, status);
        Ok(updated)
    }

    async fn require_existing(&self, request_id: i64) -> PickupResult<PickupRequest> {
        self.store
            .get_pickup_request_by_id(request_id)
            .await?
            .ok_or(PickupError::PickupRequestNotFound { id: request_id })
    }

    /// 写入之后立即读取；读不到说明存储状态异常
    async fn reload(&self, request_id: i64) -> PickupResult<PickupRequest> {
        self.store
            .get_pickup_request_by_id(request_id)
            .await?
            .ok_or_else(|| {
                PickupError::Persistence(format!("写入后无法读取取件请求 {request_id}"))
            })
    }

    async fn publish_snapshot(
        &self,
        kind: LifecycleEventKind,
        request: &PickupRequest,
    ) -> PickupResult<()> {
        let topic = kind.topic(&self.topics);
        let payload = request
            .to_payload()
            .map_err(|e| PickupError::Serialization(format!("序列化取件请求失败: {e}")))?;

        if let Err(e) = self.bus.publish(topic, &payload).await {
            counter!("pickup_publish_failures_total", "topic" => topic.to_string()).increment(1);
            error!(
                "取件请求 {} 已写入，但 {} 事件发布到 {} 失败: {}",
                request.request_id, kind, topic, e
            );
            return Err(PickupError::Publish {
                topic: topic.to_string(),
                request_id: request.request_id,
                message: e.to_string(),
            });
        }

        debug!("{} 事件已发布到 {}: {}", kind, topic, request.request_id);
        Ok(())
    }
}
