//! HTTP handlers for the patient registry

use axum::{extract::State, Json};
use shared::{NewPatient, Patient};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::PatientService;
use crate::AppState;

/// List all patients
pub async fn list_patients(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Patient>>> {
    let service = PatientService::new(state.store);
    let patients = service.list_patients().await?;
    Ok(Json(patients))
}

/// Register a patient
pub async fn create_patient(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<NewPatient>,
) -> AppResult<Json<Patient>> {
    let service = PatientService::new(state.store);
    let patient = service.create_patient(input).await?;
    Ok(Json(patient))
}
