//! HTTP request handlers

pub mod activity;
pub mod health;
pub mod inventory;
pub mod jobs;
pub mod patients;

pub use activity::*;
pub use health::*;
pub use inventory::*;
pub use jobs::*;
pub use patients::*;
