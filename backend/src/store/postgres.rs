//! PostgreSQL store
//!
//! Each collection is a table holding the full document as JSONB next to the
//! columns used for lookups and ordering. Inventory item documents are
//! versioned and pass through `shared::schema` on every read and write.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use shared::{
    item_from_document, item_to_document, ActivityInstance, ActivitySchedule, InventoryItem,
    MovementRecord, Patient,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::jobs::JobRun;

/// [`Store`] backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn decode_all<T: serde::de::DeserializeOwned>(docs: Vec<Value>) -> StoreResult<Vec<T>> {
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(Into::into))
        .collect()
}

fn decode_items(docs: Vec<Value>) -> StoreResult<Vec<InventoryItem>> {
    docs.into_iter()
        .map(|doc| item_from_document(doc).map_err(Into::into))
        .collect()
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO patients (id, name, doc, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(patient.id)
        .bind(&patient.name)
        .bind(serde_json::to_value(patient)?)
        .bind(patient.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_patient(&self, patient_id: Uuid) -> StoreResult<Option<Patient>> {
        let doc = sqlx::query_scalar::<_, Value>("SELECT doc FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(doc.map(serde_json::from_value).transpose()?)
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        let docs =
            sqlx::query_scalar::<_, Value>("SELECT doc FROM patients ORDER BY created_at, id")
                .fetch_all(&self.db)
                .await?;
        decode_all(docs)
    }

    async fn insert_item(&self, item: &InventoryItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, patient_id, name, doc, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.id)
        .bind(item.patient_id)
        .bind(&item.name)
        .bind(item_to_document(item)?)
        .bind(item.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_item(
        &self,
        patient_id: Uuid,
        item_id: Uuid,
    ) -> StoreResult<Option<InventoryItem>> {
        let doc = sqlx::query_scalar::<_, Value>(
            "SELECT doc FROM inventory_items WHERE id = $1 AND patient_id = $2",
        )
        .bind(item_id)
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(doc.map(item_from_document).transpose()?)
    }

    async fn list_items(&self, patient_id: Uuid) -> StoreResult<Vec<InventoryItem>> {
        let docs = sqlx::query_scalar::<_, Value>(
            "SELECT doc FROM inventory_items WHERE patient_id = $1 ORDER BY name, id",
        )
        .bind(patient_id)
        .fetch_all(&self.db)
        .await?;
        decode_items(docs)
    }

    async fn update_item(&self, item: &InventoryItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE inventory_items
            SET name = $3, doc = $4, updated_at = $5
            WHERE id = $1 AND patient_id = $2
            "#,
        )
        .bind(item.id)
        .bind(item.patient_id)
        .bind(&item.name)
        .bind(item_to_document(item)?)
        .bind(item.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn commit_movement(
        &self,
        item: &InventoryItem,
        record: &MovementRecord,
    ) -> StoreResult<()> {
        let item_doc = item_to_document(item)?;
        let record_doc = serde_json::to_value(record)?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE inventory_items SET doc = $3, updated_at = $4 WHERE id = $1 AND patient_id = $2",
        )
        .bind(item.id)
        .bind(item.patient_id)
        .bind(item_doc)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory_movements
                (id, patient_id, item_id, movement_type, movement_date, doc, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.patient_id)
        .bind(record.item_id)
        .bind(record.movement_type.as_str())
        .bind(record.date)
        .bind(record_doc)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_movements(
        &self,
        patient_id: Uuid,
        item_id: Option<Uuid>,
        limit: usize,
    ) -> StoreResult<Vec<MovementRecord>> {
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM inventory_movements
            WHERE patient_id = $1 AND ($2::uuid IS NULL OR item_id = $2)
            ORDER BY created_at DESC, seq DESC
            LIMIT $3
            "#,
        )
        .bind(patient_id)
        .bind(item_id)
        .bind(limit_param(limit))
        .fetch_all(&self.db)
        .await?;
        decode_all(docs)
    }

    async fn insert_schedule(&self, schedule: &ActivitySchedule) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_schedules (id, patient_id, active, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.patient_id)
        .bind(schedule.active)
        .bind(serde_json::to_value(schedule)?)
        .bind(schedule.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_schedule(
        &self,
        patient_id: Uuid,
        schedule_id: Uuid,
    ) -> StoreResult<Option<ActivitySchedule>> {
        let doc = sqlx::query_scalar::<_, Value>(
            "SELECT doc FROM activity_schedules WHERE id = $1 AND patient_id = $2",
        )
        .bind(schedule_id)
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(doc.map(serde_json::from_value).transpose()?)
    }

    async fn list_schedules(&self, patient_id: Uuid) -> StoreResult<Vec<ActivitySchedule>> {
        let docs = sqlx::query_scalar::<_, Value>(
            "SELECT doc FROM activity_schedules WHERE patient_id = $1 ORDER BY created_at, id",
        )
        .bind(patient_id)
        .fetch_all(&self.db)
        .await?;
        decode_all(docs)
    }

    async fn update_schedule(&self, schedule: &ActivitySchedule) -> StoreResult<()> {
        sqlx::query(
            "UPDATE activity_schedules SET active = $3, doc = $4 WHERE id = $1 AND patient_id = $2",
        )
        .bind(schedule.id)
        .bind(schedule.patient_id)
        .bind(schedule.active)
        .bind(serde_json::to_value(schedule)?)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn insert_instance_if_absent(&self, instance: &ActivityInstance) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO activity_instances
                (patient_id, id, schedule_id, instance_date, doc, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (patient_id, id) DO NOTHING
            "#,
        )
        .bind(instance.patient_id)
        .bind(&instance.id)
        .bind(instance.schedule_id)
        .bind(instance.date)
        .bind(serde_json::to_value(instance)?)
        .bind(instance.created_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_instance(
        &self,
        patient_id: Uuid,
        instance_id: &str,
    ) -> StoreResult<Option<ActivityInstance>> {
        let doc = sqlx::query_scalar::<_, Value>(
            "SELECT doc FROM activity_instances WHERE patient_id = $1 AND id = $2",
        )
        .bind(patient_id)
        .bind(instance_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(doc.map(serde_json::from_value).transpose()?)
    }

    async fn list_instances(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<ActivityInstance>> {
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM activity_instances
            WHERE patient_id = $1 AND instance_date = $2
            ORDER BY doc->>'preferred_time' NULLS FIRST, id
            "#,
        )
        .bind(patient_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;
        decode_all(docs)
    }

    async fn update_instance(&self, instance: &ActivityInstance) -> StoreResult<()> {
        sqlx::query("UPDATE activity_instances SET doc = $3 WHERE patient_id = $1 AND id = $2")
            .bind(instance.patient_id)
            .bind(&instance.id)
            .bind(serde_json::to_value(instance)?)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn record_job_run(&self, run: &JobRun) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO job_runs (id, job, run_date, status, doc, started_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.id)
        .bind(&run.job)
        .bind(run.run_date)
        .bind(run.status.as_str())
        .bind(serde_json::to_value(run)?)
        .bind(run.started_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_job_runs(&self, limit: usize) -> StoreResult<Vec<JobRun>> {
        let docs = sqlx::query_scalar::<_, Value>(
            "SELECT doc FROM job_runs ORDER BY started_at DESC, seq DESC LIMIT $1",
        )
        .bind(limit_param(limit))
        .fetch_all(&self.db)
        .await?;
        decode_all(docs)
    }
}
