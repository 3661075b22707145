//! Scheduled background jobs
//!
//! Each job implements [`ScheduledJob`]. [`run_job`] is the host used by both
//! the in-process scheduler and the manual-run endpoints: it applies the
//! execution budget and writes the outcome to the job run log.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::Store;

pub mod decay;
pub mod doses;
pub mod scheduler;

pub use decay::DecayJob;
pub use doses::DoseScheduleGenerator;

/// Counters reported by a job run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobReport {
    pub patients: usize,
    /// Items or schedules looked at
    pub examined: usize,
    /// Decays committed or instances created
    pub written: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
        }
    }
}

/// What started a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    Scheduled,
    Manual,
}

/// One entry of the job run log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRun {
    pub id: Uuid,
    pub job: String,
    /// Facility date the run was for
    pub run_date: NaiveDate,
    pub trigger: JobTrigger,
    pub status: JobStatus,
    pub report: JobReport,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &'static str;

    /// Process every patient for the given facility date
    async fn run(&self, today: NaiveDate) -> AppResult<JobReport>;
}

/// Run a job under a time budget and record the outcome
///
/// The run is logged whatever happens. A failed or timed-out job is returned
/// as an error after it has been recorded.
pub async fn run_job(
    store: &dyn Store,
    job: &dyn ScheduledJob,
    today: NaiveDate,
    trigger: JobTrigger,
    budget: Duration,
) -> AppResult<JobRun> {
    let started_at = Utc::now();
    tracing::info!(job = job.name(), %today, ?trigger, "Job started");

    let outcome = match tokio::time::timeout(budget, job.run(today)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::JobTimeout {
            job: job.name().to_string(),
            seconds: budget.as_secs(),
        }),
    };

    let (status, report, error) = match &outcome {
        Ok(report) => (JobStatus::Succeeded, *report, None),
        Err(e @ AppError::JobTimeout { .. }) => {
            (JobStatus::TimedOut, JobReport::default(), Some(e.to_string()))
        }
        Err(e) => (JobStatus::Failed, JobReport::default(), Some(e.to_string())),
    };

    let run = JobRun {
        id: Uuid::new_v4(),
        job: job.name().to_string(),
        run_date: today,
        trigger,
        status,
        report,
        error,
        started_at,
        finished_at: Utc::now(),
    };

    if let Err(e) = store.record_job_run(&run).await {
        tracing::error!(job = job.name(), error = %e, "Failed to record job run");
    }

    match outcome {
        Ok(report) => {
            tracing::info!(
                job = job.name(),
                %today,
                patients = report.patients,
                examined = report.examined,
                written = report.written,
                skipped = report.skipped,
                "Job finished"
            );
            Ok(run)
        }
        Err(e) => {
            tracing::error!(job = job.name(), %today, status = status.as_str(), error = %e, "Job did not complete");
            Err(e)
        }
    }
}
