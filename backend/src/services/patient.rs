//! Patient registry

use std::sync::Arc;

use chrono::Utc;
use shared::{NewPatient, Patient};
use validator::Validate;

use crate::error::AppResult;
use crate::store::Store;

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn Store>,
}

impl PatientService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_patient(&self, input: NewPatient) -> AppResult<Patient> {
        input.validate()?;
        let patient = Patient::new(input, Utc::now());
        self.store.insert_patient(&patient).await?;
        tracing::info!(patient_id = %patient.id, "Patient registered");
        Ok(patient)
    }

    pub async fn list_patients(&self) -> AppResult<Vec<Patient>> {
        Ok(self.store.list_patients().await?)
    }
}
