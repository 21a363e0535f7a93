use async_trait::async_trait;
use pickup_core::{PickupError, PickupResult};
use pickup_domain::entities::{
    now_seconds, Business, Collector, DriverAssignment, NewPickupRequest, PickupRequest,
    PickupStatus,
};
use pickup_domain::repositories::EntityStore;
use sqlx::{PgPool, Row};
use tracing::debug;

const PICKUP_REQUEST_COLUMNS: &str = r#"
    request_id, business_id, collector_id, waste_type, quantity::float8 AS quantity,
    pickup_date, status, handling_requirements, assigned_driver, assigned_vehicle, created_at
"#;

/// PostgreSQL实体存储
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_pickup_request(row: &sqlx::postgres::PgRow) -> PickupResult<PickupRequest> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<PickupStatus>()
            .map_err(PickupError::Persistence)?;

        Ok(PickupRequest {
            request_id: row.try_get("request_id")?,
            business_id: row.try_get("business_id")?,
            collector_id: row.try_get("collector_id")?,
            waste_type: row.try_get("waste_type")?,
            quantity: row.try_get("quantity")?,
            pickup_date: row.try_get("pickup_date")?,
            status,
            handling_requirements: row.try_get("handling_requirements")?,
            assigned_driver: row.try_get("assigned_driver")?,
            assigned_vehicle: row.try_get("assigned_vehicle")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn get_business_by_id(&self, id: i64) -> PickupResult<Option<Business>> {
        let row = sqlx::query(
            r#"
            SELECT b.user_id, u.email, u.full_name, b.business_name
            FROM businesses b
            JOIN users u ON u.user_id = b.user_id
            WHERE b.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PickupError::Database)?;

        match row {
            Some(row) => Ok(Some(Business {
                user_id: row.try_get("user_id")?,
                email: row.try_get("email")?,
                full_name: row.try_get("full_name")?,
                business_name: row.try_get("business_name")?,
            })),
            None => Ok(None),
        }
    }

    async fn get_collector_by_id(&self, id: i64) -> PickupResult<Option<Collector>> {
        let row = sqlx::query(
            r#"
            SELECT c.user_id, u.email, u.full_name, c.company_name
            FROM collectors c
            JOIN users u ON u.user_id = c.user_id
            WHERE c.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PickupError::Database)?;

        match row {
            Some(row) => Ok(Some(Collector {
                user_id: row.try_get("user_id")?,
                email: row.try_get("email")?,
                full_name: row.try_get("full_name")?,
                company_name: row.try_get("company_name")?,
            })),
            None => Ok(None),
        }
    }

    async fn create_pickup_request(&self, request: &NewPickupRequest) -> PickupResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO pickup_requests (
                business_id, collector_id, waste_type, quantity, pickup_date,
                status, handling_requirements, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING request_id
            "#,
        )
        .bind(request.business_id)
        .bind(request.collector_id)
        .bind(&request.waste_type)
        .bind(request.quantity)
        .bind(request.pickup_date)
        .bind(PickupStatus::Pending.as_str())
        .bind(&request.handling_requirements)
        .bind(now_seconds())
        .fetch_one(&self.pool)
        .await
        .map_err(PickupError::Database)?;

        let request_id: i64 = row.try_get("request_id")?;
        debug!("创建取件请求成功: {}", request_id);
        Ok(request_id)
    }

    async fn get_pickup_request_by_id(&self, id: i64) -> PickupResult<Option<PickupRequest>> {
        let sql = format!("SELECT {PICKUP_REQUEST_COLUMNS} FROM pickup_requests WHERE request_id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PickupError::Database)?;

        row.as_ref().map(Self::row_to_pickup_request).transpose()
    }

    async fn update_pickup_request_status(
        &self,
        id: i64,
        status: PickupStatus,
    ) -> PickupResult<bool> {
        let result = sqlx::query("UPDATE pickup_requests SET status = $1 WHERE request_id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(PickupError::Database)?;

        debug!("更新取件请求 {} 状态为 {}", id, status);
        Ok(result.rows_affected() > 0)
    }

    async fn assign_driver(&self, id: i64, assignment: DriverAssignment) -> PickupResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pickup_requests
            SET assigned_driver = $1, assigned_vehicle = $2, status = $3
            WHERE request_id = $4
            "#,
        )
        .bind(assignment.driver_id)
        .bind(assignment.vehicle_id)
        .bind(PickupStatus::Assigned.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(PickupError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_assigned_driver(&self, id: i64) -> PickupResult<bool> {
        let result =
            sqlx::query("UPDATE pickup_requests SET assigned_driver = NULL WHERE request_id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(PickupError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
