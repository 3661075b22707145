//! Shared types and models for the Carestock caregiving platform
//!
//! This crate contains the inventory and activity-scheduling rules shared
//! between the backend service, the frontend (via WASM), and the scheduled
//! jobs. Nothing here performs I/O.

pub mod models;
pub mod schema;
pub mod types;
pub mod validation;

pub use models::*;
pub use schema::*;
pub use types::*;
pub use validation::*;
