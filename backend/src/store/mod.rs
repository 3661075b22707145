//! Persistence boundary
//!
//! Services and jobs talk to a [`Store`] trait object held in `AppState`.
//! [`PgStore`] is used in production. `MemoryStore` backs the tests and is
//! only compiled with `cfg(test)` or the `test-util` feature.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    ActivityInstance, ActivitySchedule, DocumentError, InventoryItem, MovementRecord, Patient,
};
use thiserror::Error;
use uuid::Uuid;

use crate::jobs::JobRun;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Raised by `MemoryStore` when a failure was requested for a test
    #[cfg(any(test, feature = "test-util"))]
    #[error("Injected failure: {0}")]
    Injected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations needed by the services and scheduled jobs
///
/// Every item-scoped lookup takes the owning patient id; an item, schedule
/// or instance belonging to another patient is reported as absent.
#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trip to the backing store
    async fn ping(&self) -> StoreResult<()>;

    // Patients
    async fn insert_patient(&self, patient: &Patient) -> StoreResult<()>;
    async fn get_patient(&self, patient_id: Uuid) -> StoreResult<Option<Patient>>;
    async fn list_patients(&self) -> StoreResult<Vec<Patient>>;

    // Inventory
    async fn insert_item(&self, item: &InventoryItem) -> StoreResult<()>;
    async fn get_item(&self, patient_id: Uuid, item_id: Uuid)
        -> StoreResult<Option<InventoryItem>>;
    /// Items of a patient ordered by name
    async fn list_items(&self, patient_id: Uuid) -> StoreResult<Vec<InventoryItem>>;
    /// Overwrite an item's configuration
    async fn update_item(&self, item: &InventoryItem) -> StoreResult<()>;

    /// Write the new item state and append its ledger entry atomically
    async fn commit_movement(
        &self,
        item: &InventoryItem,
        record: &MovementRecord,
    ) -> StoreResult<()>;

    /// Ledger entries, newest first
    async fn list_movements(
        &self,
        patient_id: Uuid,
        item_id: Option<Uuid>,
        limit: usize,
    ) -> StoreResult<Vec<MovementRecord>>;

    // Activities
    async fn insert_schedule(&self, schedule: &ActivitySchedule) -> StoreResult<()>;
    async fn get_schedule(
        &self,
        patient_id: Uuid,
        schedule_id: Uuid,
    ) -> StoreResult<Option<ActivitySchedule>>;
    async fn list_schedules(&self, patient_id: Uuid) -> StoreResult<Vec<ActivitySchedule>>;
    async fn update_schedule(&self, schedule: &ActivitySchedule) -> StoreResult<()>;

    /// Insert an instance unless one with the same key exists
    ///
    /// Returns `true` when the instance was created.
    async fn insert_instance_if_absent(&self, instance: &ActivityInstance) -> StoreResult<bool>;
    async fn get_instance(
        &self,
        patient_id: Uuid,
        instance_id: &str,
    ) -> StoreResult<Option<ActivityInstance>>;
    async fn list_instances(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<ActivityInstance>>;
    async fn update_instance(&self, instance: &ActivityInstance) -> StoreResult<()>;

    // Job log
    async fn record_job_run(&self, run: &JobRun) -> StoreResult<()>;
    /// Most recent runs first
    async fn list_job_runs(&self, limit: usize) -> StoreResult<Vec<JobRun>>;
}
