pub mod components;
pub mod handlers;
pub mod notifier;
pub mod templates;

pub use components::{EventSubscriber, ListenerSupervisor, ShutdownManager};
pub use handlers::{ConsumerError, HandleOutcome, LifecycleEventHandler};
pub use notifier::NotificationDispatcher;
