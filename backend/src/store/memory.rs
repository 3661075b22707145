//! In-memory store used by tests

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{ActivityInstance, ActivitySchedule, InventoryItem, MovementRecord, Patient};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::jobs::JobRun;

#[derive(Default)]
struct Collections {
    patients: HashMap<Uuid, Patient>,
    items: HashMap<Uuid, InventoryItem>,
    movements: Vec<MovementRecord>,
    schedules: HashMap<Uuid, ActivitySchedule>,
    instances: HashMap<(Uuid, String), ActivityInstance>,
    job_runs: Vec<JobRun>,
}

/// [`Store`] kept in process memory
///
/// `fail_commits_for` makes every later `commit_movement` for the given item
/// fail without writing anything, which lets tests exercise job failure paths.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
    failing_items: RwLock<HashSet<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_commits_for(&self, item_id: Uuid) {
        self.failing_items.write().await.insert(item_id);
    }

    pub async fn clear_failures(&self) {
        self.failing_items.write().await.clear();
    }

    /// Every ledger entry in insertion order
    pub async fn all_movements(&self) -> Vec<MovementRecord> {
        self.data.read().await.movements.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        self.data
            .write()
            .await
            .patients
            .insert(patient.id, patient.clone());
        Ok(())
    }

    async fn get_patient(&self, patient_id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.data.read().await.patients.get(&patient_id).cloned())
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        let mut patients: Vec<Patient> =
            self.data.read().await.patients.values().cloned().collect();
        patients.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(patients)
    }

    async fn insert_item(&self, item: &InventoryItem) -> StoreResult<()> {
        self.data.write().await.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(
        &self,
        patient_id: Uuid,
        item_id: Uuid,
    ) -> StoreResult<Option<InventoryItem>> {
        Ok(self
            .data
            .read()
            .await
            .items
            .get(&item_id)
            .filter(|item| item.patient_id == patient_id)
            .cloned())
    }

    async fn list_items(&self, patient_id: Uuid) -> StoreResult<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self
            .data
            .read()
            .await
            .items
            .values()
            .filter(|item| item.patient_id == patient_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn update_item(&self, item: &InventoryItem) -> StoreResult<()> {
        self.data.write().await.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn commit_movement(
        &self,
        item: &InventoryItem,
        record: &MovementRecord,
    ) -> StoreResult<()> {
        if self.failing_items.read().await.contains(&item.id) {
            return Err(StoreError::Injected(format!(
                "commit rejected for item {}",
                item.id
            )));
        }
        let mut data = self.data.write().await;
        data.items.insert(item.id, item.clone());
        data.movements.push(record.clone());
        Ok(())
    }

    async fn list_movements(
        &self,
        patient_id: Uuid,
        item_id: Option<Uuid>,
        limit: usize,
    ) -> StoreResult<Vec<MovementRecord>> {
        let data = self.data.read().await;
        // Appended in time order, so reverse iteration is newest first
        Ok(data
            .movements
            .iter()
            .rev()
            .filter(|m| m.patient_id == patient_id)
            .filter(|m| item_id.map_or(true, |id| m.item_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_schedule(&self, schedule: &ActivitySchedule) -> StoreResult<()> {
        self.data
            .write()
            .await
            .schedules
            .insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn get_schedule(
        &self,
        patient_id: Uuid,
        schedule_id: Uuid,
    ) -> StoreResult<Option<ActivitySchedule>> {
        Ok(self
            .data
            .read()
            .await
            .schedules
            .get(&schedule_id)
            .filter(|s| s.patient_id == patient_id)
            .cloned())
    }

    async fn list_schedules(&self, patient_id: Uuid) -> StoreResult<Vec<ActivitySchedule>> {
        let mut schedules: Vec<ActivitySchedule> = self
            .data
            .read()
            .await
            .schedules
            .values()
            .filter(|s| s.patient_id == patient_id)
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(schedules)
    }

    async fn update_schedule(&self, schedule: &ActivitySchedule) -> StoreResult<()> {
        self.insert_schedule(schedule).await
    }

    async fn insert_instance_if_absent(&self, instance: &ActivityInstance) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let key = (instance.patient_id, instance.id.clone());
        if data.instances.contains_key(&key) {
            return Ok(false);
        }
        data.instances.insert(key, instance.clone());
        Ok(true)
    }

    async fn get_instance(
        &self,
        patient_id: Uuid,
        instance_id: &str,
    ) -> StoreResult<Option<ActivityInstance>> {
        Ok(self
            .data
            .read()
            .await
            .instances
            .get(&(patient_id, instance_id.to_string()))
            .cloned())
    }

    async fn list_instances(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<ActivityInstance>> {
        let mut instances: Vec<ActivityInstance> = self
            .data
            .read()
            .await
            .instances
            .values()
            .filter(|i| i.patient_id == patient_id && i.date == date)
            .cloned()
            .collect();
        instances.sort_by(|a, b| a.preferred_time.cmp(&b.preferred_time).then(a.id.cmp(&b.id)));
        Ok(instances)
    }

    async fn update_instance(&self, instance: &ActivityInstance) -> StoreResult<()> {
        self.data
            .write()
            .await
            .instances
            .insert((instance.patient_id, instance.id.clone()), instance.clone());
        Ok(())
    }

    async fn record_job_run(&self, run: &JobRun) -> StoreResult<()> {
        self.data.write().await.job_runs.push(run.clone());
        Ok(())
    }

    async fn list_job_runs(&self, limit: usize) -> StoreResult<Vec<JobRun>> {
        Ok(self
            .data
            .read()
            .await
            .job_runs
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
