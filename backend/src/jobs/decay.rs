//! Daily shelf-life consumption job
//!
//! Walks every patient's inventory and applies one day of decay to each
//! perishable item in active use. The item update and its
//! `consumo_automatico` ledger entry are committed together, and the item's
//! `last_decay_on` watermark makes a re-run on the same date skip items that
//! were already processed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use shared::DecayStep;

use super::{JobReport, ScheduledJob};
use crate::error::AppResult;
use crate::store::Store;

pub struct DecayJob {
    store: Arc<dyn Store>,
}

impl DecayJob {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ScheduledJob for DecayJob {
    fn name(&self) -> &'static str {
        "decay"
    }

    async fn run(&self, today: NaiveDate) -> AppResult<JobReport> {
        let mut report = JobReport::default();

        for patient in self.store.list_patients().await? {
            report.patients += 1;
            let items = self.store.list_items(patient.id).await?;

            for item in items {
                report.examined += 1;

                let outcome = match item.apply_daily_decay(today, Utc::now()) {
                    DecayStep::Skipped(reason) => {
                        report.skipped += 1;
                        tracing::debug!(
                            patient_id = %patient.id,
                            item_id = %item.id,
                            reason = reason.as_str(),
                            "Decay skipped"
                        );
                        continue;
                    }
                    DecayStep::Applied(outcome) => outcome,
                };

                if let Err(e) = self
                    .store
                    .commit_movement(&outcome.item, &outcome.record)
                    .await
                {
                    tracing::error!(
                        patient_id = %patient.id,
                        item_id = %item.id,
                        error = %e,
                        "Failed to commit daily decay"
                    );
                    return Err(e.into());
                }

                report.written += 1;
                tracing::info!(
                    patient_id = %patient.id,
                    item_id = %item.id,
                    item = %item.name,
                    consumed = %outcome.consumed,
                    remaining = %outcome.item.operational_qty,
                    depleted = outcome.depleted,
                    "Daily decay applied"
                );
            }
        }

        Ok(report)
    }
}
