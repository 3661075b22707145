//! Recurring activity schedules and their dated instances

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_time_of_day;

/// Part of the day an activity belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Shift {
    #[serde(rename = "mañana", alias = "manana")]
    Morning,
    #[serde(rename = "tarde")]
    Afternoon,
    #[serde(rename = "noche")]
    Night,
}

/// A fully specified activity, e.g. a medication round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefinedActivity {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// A reserved slot whose exact activity is chosen on the day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenSlot {
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Modality of a schedule together with the data it carries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "modality", rename_all = "snake_case")]
pub enum ActivityPlan {
    DefinedActivity { defined_activity: DefinedActivity },
    OpenSlot { open_slot: OpenSlot },
}

impl ActivityPlan {
    /// Activity type resolved from whichever sub-record applies
    pub fn activity_type(&self) -> &str {
        match self {
            ActivityPlan::DefinedActivity { defined_activity } => &defined_activity.activity_type,
            ActivityPlan::OpenSlot { open_slot } => &open_slot.activity_type,
        }
    }
}

/// Status of a dated activity instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pendiente,
    Completada,
    Omitida,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Pendiente => "pendiente",
            InstanceStatus::Completada => "completada",
            InstanceStatus::Omitida => "omitida",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurring activity definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivitySchedule {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    /// Weekday indexes, 0 = Sunday .. 6 = Saturday
    pub days_of_week: Vec<u8>,
    pub shift: Shift,
    /// Preferred start time, "HH:MM"
    pub preferred_time: Option<String>,
    #[serde(flatten)]
    pub plan: ActivityPlan,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a schedule
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewActivitySchedule {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 7))]
    pub days_of_week: Vec<u8>,
    pub shift: Shift,
    #[serde(default)]
    pub preferred_time: Option<String>,
    #[serde(flatten)]
    pub plan: ActivityPlan,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One concrete dated occurrence of a schedule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityInstance {
    /// `{schedule_id}_{YYYY-MM-DD}`
    pub id: String,
    pub schedule_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub name: String,
    #[serde(flatten)]
    pub plan: ActivityPlan,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub shift: Shift,
    pub preferred_time: Option<String>,
    pub status: InstanceStatus,
    pub auto_generated: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Weekday index {0} is out of range (0 = Sunday .. 6 = Saturday)")]
    InvalidWeekday(u8),

    #[error("At least one weekday is required")]
    NoWeekdays,

    #[error("Invalid preferred time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Activity type is required")]
    MissingActivityType,

    #[error("Cannot change instance status from {from} to {to}")]
    InvalidStatusTransition {
        from: InstanceStatus,
        to: InstanceStatus,
    },
}

/// Weekday index of a date, 0 = Sunday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Deterministic instance key for a schedule on a date
pub fn instance_id(schedule_id: Uuid, date: NaiveDate) -> String {
    format!("{}_{}", schedule_id, date.format("%Y-%m-%d"))
}

impl ActivitySchedule {
    pub fn new(
        patient_id: Uuid,
        input: NewActivitySchedule,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let mut days = input.days_of_week;
        if days.is_empty() {
            return Err(ScheduleError::NoWeekdays);
        }
        if let Some(bad) = days.iter().find(|d| **d > 6) {
            return Err(ScheduleError::InvalidWeekday(*bad));
        }
        days.sort_unstable();
        days.dedup();

        let preferred_time = match input.preferred_time {
            Some(time) if !time.trim().is_empty() => {
                let time = time.trim().to_string();
                validate_time_of_day(&time).map_err(|_| ScheduleError::InvalidTime(time.clone()))?;
                Some(time)
            }
            _ => None,
        };

        if input.plan.activity_type().trim().is_empty() {
            return Err(ScheduleError::MissingActivityType);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            patient_id,
            name: input.name.trim().to_string(),
            days_of_week: days,
            shift: input.shift,
            preferred_time,
            plan: input.plan,
            active: input.active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the generator should produce an instance for `date`
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        self.active && self.days_of_week.contains(&weekday_index(date))
    }

    pub fn instance_id(&self, date: NaiveDate) -> String {
        instance_id(self.id, date)
    }

    /// Snapshot this schedule into a pending, auto-generated instance
    pub fn instantiate(&self, date: NaiveDate, now: DateTime<Utc>) -> ActivityInstance {
        ActivityInstance {
            id: self.instance_id(date),
            schedule_id: self.id,
            patient_id: self.patient_id,
            date,
            name: self.name.clone(),
            plan: self.plan.clone(),
            activity_type: self.plan.activity_type().to_string(),
            shift: self.shift,
            preferred_time: self.preferred_time.clone(),
            status: InstanceStatus::Pendiente,
            auto_generated: true,
            notes: None,
            completed_at: None,
            created_at: now,
        }
    }
}

impl ActivityInstance {
    /// Close a pending instance as completed or skipped
    pub fn transition(
        &mut self,
        status: InstanceStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        if self.status != InstanceStatus::Pendiente || status == InstanceStatus::Pendiente {
            return Err(ScheduleError::InvalidStatusTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.completed_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }
}
