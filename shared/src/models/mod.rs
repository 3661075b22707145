//! Domain models for the Carestock platform

mod activity;
mod decay;
mod inventory;
mod movement;
mod patient;

pub use activity::*;
pub use decay::*;
pub use inventory::*;
pub use movement::*;
pub use patient::*;
