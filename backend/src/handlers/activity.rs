//! HTTP handlers for activity schedules and instances

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{ActivityInstance, ActivitySchedule, NewActivitySchedule};
use uuid::Uuid;

use crate::error::AppResult;
use crate::jobs::scheduler::facility_date;
use crate::middleware::CurrentUser;
use crate::services::activity::{ActivityService, UpdateInstanceStatusInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetActiveInput {
    pub active: bool,
}

/// Date filter; defaults to the facility's current date
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

pub async fn list_schedules(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> AppResult<Json<Vec<ActivitySchedule>>> {
    let service = ActivityService::new(state.store);
    let schedules = service.list_schedules(patient_id).await?;
    Ok(Json(schedules))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Json(input): Json<NewActivitySchedule>,
) -> AppResult<Json<ActivitySchedule>> {
    let service = ActivityService::new(state.store);
    let schedule = service.create_schedule(patient_id, input).await?;
    Ok(Json(schedule))
}

pub async fn set_schedule_active(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((patient_id, schedule_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<SetActiveInput>,
) -> AppResult<Json<ActivitySchedule>> {
    let service = ActivityService::new(state.store);
    let schedule = service
        .set_schedule_active(patient_id, schedule_id, input.active)
        .await?;
    Ok(Json(schedule))
}

pub async fn list_instances(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<Vec<ActivityInstance>>> {
    let date = query
        .date
        .unwrap_or_else(|| facility_date(Utc::now(), state.config.facility_offset()));
    let service = ActivityService::new(state.store);
    let instances = service.list_instances(patient_id, date).await?;
    Ok(Json(instances))
}

pub async fn update_instance_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((patient_id, instance_id)): Path<(Uuid, String)>,
    Json(input): Json<UpdateInstanceStatusInput>,
) -> AppResult<Json<ActivityInstance>> {
    let service = ActivityService::new(state.store);
    let instance = service
        .update_instance_status(patient_id, &instance_id, input)
        .await?;
    Ok(Json(instance))
}
