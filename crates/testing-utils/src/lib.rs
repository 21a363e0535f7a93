//! # Pickup Testing Utils
//!
//! Shared testing utilities for the pickup coordinator workspace.
//!
//! ## Features
//!
//! - **Mock Entity Store**: In-memory `EntityStore` with write and lookup failure injection
//! - **Recording Email Transport**: Captures delivered notifications, can fail chosen recipients
//! - **Failing Event Bus**: Wraps a real bus and rejects publishes on demand
//! - **Test Data Builders**: Pickup requests and parties with sensible defaults
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! pickup-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
