//! Versioned persistence format for inventory item documents
//!
//! Documents carry a `schema_version` field. Reads go through
//! [`item_from_document`], which upgrades older layouts to the current
//! [`InventoryItem`] shape, so callers never see partially-populated items.
//!
//! Version 1 is the camelCase layout exported from the hosted document
//! database, where most fields were optional and filled in ad hoc by readers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{InventoryItem, ItemCategory};

/// Schema version written by [`item_to_document`]
pub const ITEM_SCHEMA_VERSION: u64 = 2;

const VERSION_FIELD: &str = "schema_version";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Document is not a JSON object")]
    NotAnObject,

    #[error("Unsupported schema version {0}")]
    UnsupportedVersion(u64),

    #[error("Document is missing required field '{0}'")]
    MissingField(&'static str),
}

/// Serialize an item with the current schema version tag
pub fn item_to_document(item: &InventoryItem) -> Result<Value, DocumentError> {
    let mut value = serde_json::to_value(item)?;
    let map = value.as_object_mut().ok_or(DocumentError::NotAnObject)?;
    map.insert(VERSION_FIELD.to_string(), Value::from(ITEM_SCHEMA_VERSION));
    Ok(value)
}

/// Read an item document of any supported version
pub fn item_from_document(mut value: Value) -> Result<InventoryItem, DocumentError> {
    let map = value.as_object_mut().ok_or(DocumentError::NotAnObject)?;
    let version = match map.remove(VERSION_FIELD) {
        None => 1,
        Some(v) => v.as_u64().ok_or(DocumentError::UnsupportedVersion(0))?,
    };

    match version {
        1 => {
            let legacy: LegacyItemV1 = serde_json::from_value(value)?;
            legacy.upgrade()
        }
        ITEM_SCHEMA_VERSION => Ok(serde_json::from_value(value)?),
        other => Err(DocumentError::UnsupportedVersion(other)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyItemV1 {
    id: Option<Uuid>,
    patient_id: Option<Uuid>,
    name: Option<String>,
    category: Option<ItemCategory>,
    unit: Option<String>,
    master_qty: Option<Decimal>,
    transit_qty: Option<Decimal>,
    operational_qty: Option<Decimal>,
    min_master: Option<Decimal>,
    min_transit: Option<Decimal>,
    min_operational: Option<Decimal>,
    has_shelf_life: Option<bool>,
    shelf_life_days: Option<u32>,
    consumption_start_date: Option<DateTime<Utc>>,
    last_decay_on: Option<NaiveDate>,
    linked_to_pillbox: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl LegacyItemV1 {
    fn upgrade(self) -> Result<InventoryItem, DocumentError> {
        let created_at = self.created_at.ok_or(DocumentError::MissingField("createdAt"))?;
        let transit_qty = self.transit_qty.unwrap_or(Decimal::ZERO);

        let mut item = InventoryItem {
            id: self.id.ok_or(DocumentError::MissingField("id"))?,
            patient_id: self.patient_id.ok_or(DocumentError::MissingField("patientId"))?,
            name: self.name.ok_or(DocumentError::MissingField("name"))?,
            category: self.category.unwrap_or(ItemCategory::Consumable),
            unit: self.unit.unwrap_or_default(),
            master_qty: self.master_qty.unwrap_or(Decimal::ZERO),
            transit_qty,
            operational_qty: self.operational_qty.unwrap_or(Decimal::ZERO),
            min_master: self.min_master.unwrap_or(Decimal::ZERO),
            min_transit: self.min_transit.unwrap_or(Decimal::ZERO),
            min_operational: self.min_operational.unwrap_or(Decimal::ZERO),
            has_shelf_life: self.has_shelf_life.unwrap_or(false),
            shelf_life_days: self.shelf_life_days.unwrap_or(0),
            // Always re-derived from the shelf life by normalize()
            daily_consumption_percent: Decimal::ZERO,
            consumption_start_date: self.consumption_start_date,
            last_decay_on: self.last_decay_on,
            // Items that already hold transit stock keep their pillbox link
            linked_to_pillbox: self
                .linked_to_pillbox
                .unwrap_or(transit_qty > Decimal::ZERO),
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        };
        item.normalize();
        Ok(item)
    }
}
