pub mod entities;
pub mod events;
pub mod messaging;
pub mod notification;
pub mod repositories;

pub use entities::*;
pub use events::*;
pub use messaging::*;
pub use notification::*;
pub use repositories::*;
pub use pickup_core::{PickupError, PickupResult};
