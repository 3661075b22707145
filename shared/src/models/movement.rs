//! Movement ledger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::InventoryItem;
use crate::types::Actor;

/// Kind of change recorded in the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// New stock received into the master pool
    Entrada,
    /// Stock taken out of the operational pool
    Salida,
    /// Stock moved between pools
    Transferencia,
    /// Operational pool reconciled to an absolute value
    Ajuste,
    /// Daily shelf-life consumption applied by the scheduled job
    ConsumoAutomatico,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "entrada",
            MovementType::Salida => "salida",
            MovementType::Transferencia => "transferencia",
            MovementType::Ajuste => "ajuste",
            MovementType::ConsumoAutomatico => "consumo_automatico",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where stock came from or went to
///
/// The three pools plus the two endpoints outside the item: `externo`
/// (new stock arriving) and `consumido` (stock used up).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Externo,
    Maestro,
    Transito,
    Operativo,
    Consumido,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Externo => "externo",
            Location::Maestro => "maestro",
            Location::Transito => "transito",
            Location::Operativo => "operativo",
            Location::Consumido => "consumido",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub movement_type: MovementType,
    pub origin: Location,
    pub destination: Location,
    /// Magnitude moved, or the new absolute value for `ajuste`
    pub quantity: Decimal,
    pub user_id: String,
    pub user_name: String,
    pub reason: Option<String>,
    /// Facility-local date of the movement
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// The parts of a ledger entry decided by the movement itself
#[derive(Debug, Clone, PartialEq)]
pub struct MovementDraft {
    pub movement_type: MovementType,
    pub origin: Location,
    pub destination: Location,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

impl MovementRecord {
    /// Stamp a draft with the item, actor and time it applies to
    pub fn record(
        item: &InventoryItem,
        draft: MovementDraft,
        actor: &Actor,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: item.patient_id,
            item_id: item.id,
            item_name: item.name.clone(),
            movement_type: draft.movement_type,
            origin: draft.origin,
            destination: draft.destination,
            quantity: draft.quantity,
            user_id: actor.user_id.clone(),
            user_name: actor.user_name.clone(),
            reason: draft.reason,
            date,
            created_at: now,
        }
    }
}
