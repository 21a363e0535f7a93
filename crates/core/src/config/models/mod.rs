pub mod app_config;
pub mod database;
pub mod listener;
pub mod message_queue;
pub mod notification;
pub mod observability;

pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use listener::ListenerConfig;
pub use message_queue::{MessageQueueConfig, MessageQueueType, SubscriptionsConfig, TopicsConfig};
pub use notification::{NotificationConfig, NotificationTransportType};
pub use observability::ObservabilityConfig;
