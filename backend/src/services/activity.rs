//! Activity schedules and their daily instances

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{ActivityInstance, ActivitySchedule, InstanceStatus, NewActivitySchedule};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::Store;

/// Input for closing an instance
#[derive(Debug, Deserialize)]
pub struct UpdateInstanceStatusInput {
    pub status: InstanceStatus,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn Store>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn ensure_patient(&self, patient_id: Uuid) -> AppResult<()> {
        match self.store.get_patient(patient_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Patient".to_string())),
        }
    }

    pub async fn create_schedule(
        &self,
        patient_id: Uuid,
        input: NewActivitySchedule,
    ) -> AppResult<ActivitySchedule> {
        input.validate()?;
        self.ensure_patient(patient_id).await?;

        let schedule = ActivitySchedule::new(patient_id, input, Utc::now())?;
        self.store.insert_schedule(&schedule).await?;

        tracing::info!(
            patient_id = %patient_id,
            schedule_id = %schedule.id,
            activity_type = schedule.plan.activity_type(),
            "Activity schedule created"
        );
        Ok(schedule)
    }

    pub async fn list_schedules(&self, patient_id: Uuid) -> AppResult<Vec<ActivitySchedule>> {
        self.ensure_patient(patient_id).await?;
        Ok(self.store.list_schedules(patient_id).await?)
    }

    /// Enable or pause a schedule; paused schedules generate no instances
    pub async fn set_schedule_active(
        &self,
        patient_id: Uuid,
        schedule_id: Uuid,
        active: bool,
    ) -> AppResult<ActivitySchedule> {
        let mut schedule = self
            .store
            .get_schedule(patient_id, schedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Activity schedule".to_string()))?;

        if schedule.active != active {
            schedule.active = active;
            schedule.updated_at = Utc::now();
            self.store.update_schedule(&schedule).await?;
            tracing::info!(schedule_id = %schedule_id, active, "Activity schedule toggled");
        }
        Ok(schedule)
    }

    pub async fn list_instances(
        &self,
        patient_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Vec<ActivityInstance>> {
        self.ensure_patient(patient_id).await?;
        Ok(self.store.list_instances(patient_id, date).await?)
    }

    /// Mark a pending instance as completed or skipped
    pub async fn update_instance_status(
        &self,
        patient_id: Uuid,
        instance_id: &str,
        input: UpdateInstanceStatusInput,
    ) -> AppResult<ActivityInstance> {
        let mut instance = self
            .store
            .get_instance(patient_id, instance_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Activity instance".to_string()))?;

        instance.transition(input.status, input.notes, Utc::now())?;
        self.store.update_instance(&instance).await?;

        tracing::info!(
            patient_id = %patient_id,
            instance_id = %instance_id,
            status = %instance.status,
            "Activity instance closed"
        );
        Ok(instance)
    }
}
