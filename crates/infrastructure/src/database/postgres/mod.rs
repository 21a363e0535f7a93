pub mod postgres_entity_store;

pub use postgres_entity_store::*;
