//! 领域仓储抽象
//!
//! 定义实体存储的访问接口。更新类操作返回是否有行被修改，
//! 由调用方把 `false` 转换为"请求不存在"。

use async_trait::async_trait;
use pickup_core::PickupResult;

use crate::entities::{
    Business, Collector, DriverAssignment, NewPickupRequest, PickupRequest, PickupStatus,
};

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_business_by_id(&self, id: i64) -> PickupResult<Option<Business>>;
    async fn get_collector_by_id(&self, id: i64) -> PickupResult<Option<Collector>>;

    /// 以待处理状态写入新请求，返回生成的请求ID
    async fn create_pickup_request(&self, request: &NewPickupRequest) -> PickupResult<i64>;
    async fn get_pickup_request_by_id(&self, id: i64) -> PickupResult<Option<PickupRequest>>;
    async fn update_pickup_request_status(&self, id: i64, status: PickupStatus)
        -> PickupResult<bool>;

    /// 写入司机和车辆，并把状态置为已分配
    async fn assign_driver(&self, id: i64, assignment: DriverAssignment) -> PickupResult<bool>;

    /// 仅清除司机，车辆和状态保持不变
    async fn clear_assigned_driver(&self, id: i64) -> PickupResult<bool>;
}
