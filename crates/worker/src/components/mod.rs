pub mod shutdown;
pub mod subscriber;
pub mod supervisor;

pub use shutdown::ShutdownManager;
pub use subscriber::EventSubscriber;
pub use supervisor::ListenerSupervisor;
