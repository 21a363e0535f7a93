use std::time::Duration;

use pickup_core::config::DatabaseConfig;
use pickup_core::logging::mask_url_credentials;
use pickup_core::{PickupError, PickupResult};
use sqlx::PgPool;
use tracing::info;

use super::postgres::PostgresEntityStore;

/// 数据库连接池管理器
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// 按配置建立连接池，需要时执行迁移
    pub async fn new(config: &DatabaseConfig) -> PickupResult<Self> {
        info!("连接数据库: {}", mask_url_credentials(&config.url));

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.url)
            .await
            .map_err(PickupError::Database)?;

        let manager = Self { pool };
        if config.run_migrations {
            manager.migrate().await?;
        }
        Ok(manager)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> PickupResult<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PickupError::Persistence(format!("数据库迁移失败: {e}")))?;
        info!("数据库迁移完成");
        Ok(())
    }

    pub fn entity_store(&self) -> PostgresEntityStore {
        PostgresEntityStore::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
