//! Daily dose schedule generator
//!
//! Materializes today's activity instances from every active schedule that
//! runs on today's weekday. Instance keys are deterministic, so running the
//! generator twice for the same date creates nothing new.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{JobReport, ScheduledJob};
use crate::error::AppResult;
use crate::store::Store;

pub struct DoseScheduleGenerator {
    store: Arc<dyn Store>,
}

impl DoseScheduleGenerator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ScheduledJob for DoseScheduleGenerator {
    fn name(&self) -> &'static str {
        "doses"
    }

    async fn run(&self, today: NaiveDate) -> AppResult<JobReport> {
        let mut report = JobReport::default();

        for patient in self.store.list_patients().await? {
            report.patients += 1;
            let schedules = self.store.list_schedules(patient.id).await?;

            for schedule in schedules.iter().filter(|s| s.runs_on(today)) {
                report.examined += 1;
                let instance = schedule.instantiate(today, Utc::now());

                let created = match self.store.insert_instance_if_absent(&instance).await {
                    Ok(created) => created,
                    Err(e) => {
                        tracing::error!(
                            patient_id = %patient.id,
                            schedule_id = %schedule.id,
                            error = %e,
                            "Failed to generate activity instance"
                        );
                        return Err(e.into());
                    }
                };

                if created {
                    report.written += 1;
                    tracing::debug!(
                        patient_id = %patient.id,
                        instance_id = %instance.id,
                        activity_type = %instance.activity_type,
                        "Activity instance generated"
                    );
                } else {
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }
}
