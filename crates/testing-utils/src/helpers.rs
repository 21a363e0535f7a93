//! Integration test helpers

use std::future::Future;
use std::time::Duration;

use pickup_core::config::{AppConfig, MessageQueueType, NotificationTransportType};

use crate::builders::{business_fixture, collector_fixture};
use crate::mocks::MockEntityStore;

/// Configuration wired for in-process runs: in-memory bus, log-only mail
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.message_queue.r#type = MessageQueueType::InMemory;
    config.notification.transport = NotificationTransportType::Log;
    config.listener.receive_retry_delay_ms = 10;
    config.listener.shutdown_timeout_seconds = 5;
    config
}

/// Store seeded with business 1 and collector 2
pub fn seeded_store() -> MockEntityStore {
    let store = MockEntityStore::new();
    store.add_business(business_fixture(1));
    store.add_collector(collector_fixture(2));
    store
}

/// Polls `condition` until it holds or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
