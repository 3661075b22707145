//! HTTP handlers for manual job runs and the run log

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::activity::DateQuery;
use crate::error::{AppError, AppResult};
use crate::jobs::{
    run_job, scheduler::facility_date, DecayJob, DoseScheduleGenerator, JobRun, JobTrigger,
    ScheduledJob,
};
use crate::middleware::{check_permission, CurrentUser};
use crate::AppState;

const DEFAULT_RUN_LIMIT: usize = 20;
const MAX_RUN_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct RunLogQuery {
    pub limit: Option<usize>,
}

async fn run_now(
    state: &AppState,
    current_user: &CurrentUser,
    job: &dyn ScheduledJob,
    query: DateQuery,
) -> AppResult<Json<JobRun>> {
    check_permission(&current_user.0, "jobs", "run")?;
    let today = facility_date(Utc::now(), state.config.facility_offset());
    let date = query.date.unwrap_or(today);
    // A future date would move the decay watermark ahead of the nightly runs
    if date > today {
        return Err(AppError::Validation {
            field: "date".to_string(),
            message: format!("Cannot run a job for a future date ({})", date),
            message_es: "No se puede ejecutar un trabajo con fecha futura".to_string(),
        });
    }

    tracing::info!(job = job.name(), %date, user_id = %current_user.0.user_id, "Manual job run requested");
    let run = run_job(
        state.store.as_ref(),
        job,
        date,
        JobTrigger::Manual,
        state.config.jobs.timeout(),
    )
    .await?;
    Ok(Json(run))
}

/// Run the daily decay job now
pub async fn run_decay(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<JobRun>> {
    let job = DecayJob::new(state.store.clone());
    run_now(&state, &current_user, &job, query).await
}

/// Run the dose schedule generator now
pub async fn run_doses(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<JobRun>> {
    let job = DoseScheduleGenerator::new(state.store.clone());
    run_now(&state, &current_user, &job, query).await
}

/// Most recent job runs
pub async fn list_job_runs(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<RunLogQuery>,
) -> AppResult<Json<Vec<JobRun>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RUN_LIMIT)
        .clamp(1, MAX_RUN_LIMIT);
    let runs = state.store.list_job_runs(limit).await?;
    Ok(Json(runs))
}
