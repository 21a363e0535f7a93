pub mod database;
pub mod in_memory_queue;
pub mod mailer;
pub mod message_queue;
pub mod message_queue_factory;

pub use database::*;
pub use in_memory_queue::*;
pub use mailer::*;
pub use message_queue::*;
pub use message_queue_factory::*;
