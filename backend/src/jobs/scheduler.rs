//! In-process daily scheduler
//!
//! One tokio task per job sleeps until the job's next local fire time in the
//! facility's fixed UTC offset, runs it through [`run_job`], and repeats
//! until the shutdown signal flips.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{run_job, DecayJob, DoseScheduleGenerator, JobTrigger, ScheduledJob};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::Store;

/// Facility-local calendar date of an instant
pub fn facility_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// First instant strictly after `now` whose facility-local time is `at`
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local_today = facility_date(now, offset);
    let candidate = (local_today.and_time(at) - offset).and_utc();
    if candidate > now {
        candidate
    } else {
        candidate + chrono::Duration::days(1)
    }
}

/// Start the decay and dose generator loops
pub fn spawn(
    store: Arc<dyn Store>,
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> AppResult<Vec<JoinHandle<()>>> {
    let offset = config.facility_offset();
    let budget = config.jobs.timeout();
    let decay_at = config
        .jobs
        .decay_time()
        .map_err(|e| AppError::Configuration(e.to_string()))?;
    let doses_at = config
        .jobs
        .doses_time()
        .map_err(|e| AppError::Configuration(e.to_string()))?;

    let decay: Arc<dyn ScheduledJob> = Arc::new(DecayJob::new(store.clone()));
    let doses: Arc<dyn ScheduledJob> = Arc::new(DoseScheduleGenerator::new(store.clone()));

    Ok(vec![
        tokio::spawn(run_daily(
            decay,
            store.clone(),
            decay_at,
            offset,
            budget,
            shutdown.clone(),
        )),
        tokio::spawn(run_daily(doses, store, doses_at, offset, budget, shutdown)),
    ])
}

async fn run_daily(
    job: Arc<dyn ScheduledJob>,
    store: Arc<dyn Store>,
    at: NaiveTime,
    offset: FixedOffset,
    budget: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, at, offset);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(job = job.name(), next_run = %next, "Job scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => {
                tracing::info!(job = job.name(), "Scheduler stopping");
                return;
            }
        }

        let today = facility_date(next, offset);
        // run_job records and logs failures; the loop keeps its schedule
        let _ = run_job(store.as_ref(), job.as_ref(), today, JobTrigger::Scheduled, budget).await;
    }
}
