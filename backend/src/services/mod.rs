//! Business logic services for the Carestock platform

pub mod activity;
pub mod inventory;
pub mod patient;

pub use activity::ActivityService;
pub use inventory::InventoryService;
pub use patient::PatientService;
