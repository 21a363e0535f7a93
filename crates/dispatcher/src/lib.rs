pub mod commands;
pub mod topology;

pub use commands::PickupRequestCommands;
pub use topology::{provision, ProvisionReport};
