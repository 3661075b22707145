//! Patient models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A person receiving care; owns inventory and activity schedules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPatient {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

impl Patient {
    pub fn new(input: NewPatient, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            created_at: now,
        }
    }
}
