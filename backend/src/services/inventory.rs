//! Inventory service: items, movements and stock alerts

use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use serde::Serialize;
use shared::{
    clamp_movement_limit, validate_new_item, validate_threshold, Actor, InventoryItem,
    MovementRecord, MovementRequest, NewInventoryItem, PoolStatus, UpdateInventoryItem,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::jobs::scheduler::facility_date;
use crate::store::Store;

/// An item together with the status of each of its pools
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub status: PoolStatus,
}

impl From<InventoryItem> for ItemView {
    fn from(item: InventoryItem) -> Self {
        let status = item.status();
        Self { item, status }
    }
}

/// Result of an accepted movement
#[derive(Debug, Clone, Serialize)]
pub struct MovementResult {
    pub item: ItemView,
    pub movement: MovementRecord,
}

/// Inventory service for managing items and their stock movements
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn Store>,
    offset: FixedOffset,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(store: Arc<dyn Store>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    async fn ensure_patient(&self, patient_id: Uuid) -> AppResult<()> {
        match self.store.get_patient(patient_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Patient".to_string())),
        }
    }

    async fn load_item(&self, patient_id: Uuid, item_id: Uuid) -> AppResult<InventoryItem> {
        self.store
            .get_item(patient_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    /// Create an item for a patient
    pub async fn create_item(
        &self,
        patient_id: Uuid,
        input: NewInventoryItem,
    ) -> AppResult<ItemView> {
        input.validate()?;
        validate_new_item(&input).map_err(|msg| AppError::Validation {
            field: "item".to_string(),
            message: msg.to_string(),
            message_es: "Los datos del artículo no son válidos".to_string(),
        })?;
        self.ensure_patient(patient_id).await?;

        let item = InventoryItem::new(patient_id, input, Utc::now());
        self.store.insert_item(&item).await?;

        tracing::info!(
            patient_id = %patient_id,
            item_id = %item.id,
            decaying = item.is_decaying(),
            "Inventory item created"
        );
        Ok(item.into())
    }

    /// Update an item's configuration
    pub async fn update_item(
        &self,
        patient_id: Uuid,
        item_id: Uuid,
        input: UpdateInventoryItem,
    ) -> AppResult<ItemView> {
        input.validate()?;
        for threshold in [input.min_master, input.min_transit, input.min_operational]
            .into_iter()
            .flatten()
        {
            validate_threshold(threshold).map_err(|msg| AppError::Validation {
                field: "min".to_string(),
                message: msg.to_string(),
                message_es: "Los mínimos no pueden ser negativos".to_string(),
            })?;
        }

        let mut item = self.load_item(patient_id, item_id).await?;
        item.apply_update(input, Utc::now())
            .map_err(|msg| AppError::ValidationError(msg.to_string()))?;
        self.store.update_item(&item).await?;

        tracing::info!(patient_id = %patient_id, item_id = %item_id, "Inventory item updated");
        Ok(item.into())
    }

    /// Get one item with its pool status
    pub async fn get_item(&self, patient_id: Uuid, item_id: Uuid) -> AppResult<ItemView> {
        Ok(self.load_item(patient_id, item_id).await?.into())
    }

    /// List a patient's items with their pool status
    pub async fn list_items(&self, patient_id: Uuid) -> AppResult<Vec<ItemView>> {
        self.ensure_patient(patient_id).await?;
        let items = self.store.list_items(patient_id).await?;
        Ok(items.into_iter().map(ItemView::from).collect())
    }

    /// Apply a movement and append it to the ledger
    ///
    /// The item update and the ledger entry are committed together; a
    /// rejected movement writes nothing.
    pub async fn record_movement(
        &self,
        patient_id: Uuid,
        item_id: Uuid,
        actor: &Actor,
        request: MovementRequest,
    ) -> AppResult<MovementResult> {
        let item = self.load_item(patient_id, item_id).await?;
        let now = Utc::now();
        let today = facility_date(now, self.offset);

        let applied = item.apply_movement(&request, actor, today, now).map_err(|e| {
            tracing::debug!(
                patient_id = %patient_id,
                item_id = %item_id,
                movement_type = %request.movement_type(),
                reason = %e,
                "Movement rejected"
            );
            AppError::from(e)
        })?;

        self.store
            .commit_movement(&applied.item, &applied.record)
            .await?;

        tracing::info!(
            patient_id = %patient_id,
            item_id = %item_id,
            movement_type = %applied.record.movement_type,
            quantity = %applied.record.quantity,
            user_id = %actor.user_id,
            "Movement recorded"
        );

        Ok(MovementResult {
            item: applied.item.into(),
            movement: applied.record,
        })
    }

    /// Ledger entries for a patient, or one of its items, newest first
    pub async fn list_movements(
        &self,
        patient_id: Uuid,
        item_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> AppResult<Vec<MovementRecord>> {
        match item_id {
            Some(item_id) => {
                self.load_item(patient_id, item_id).await?;
            }
            None => self.ensure_patient(patient_id).await?,
        }
        let movements = self
            .store
            .list_movements(patient_id, item_id, clamp_movement_limit(limit))
            .await?;
        Ok(movements)
    }

    /// Items with at least one pool at or below its minimum
    pub async fn stock_alerts(&self, patient_id: Uuid) -> AppResult<Vec<ItemView>> {
        let items = self.list_items(patient_id).await?;
        Ok(items
            .into_iter()
            .filter(|view| view.status.needs_attention())
            .collect())
    }
}
