//! HTTP handlers for inventory management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{MovementKind, MovementRecord, MovementRequest, NewInventoryItem, UpdateInventoryItem};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::inventory::{InventoryService, ItemView, MovementResult};
use crate::AppState;

/// Query parameters for ledger listings
#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub limit: Option<usize>,
}

fn service(state: AppState) -> InventoryService {
    let offset = state.config.facility_offset();
    InventoryService::new(state.store, offset)
}

/// List a patient's items with pool status
pub async fn list_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> AppResult<Json<Vec<ItemView>>> {
    let items = service(state).list_items(patient_id).await?;
    Ok(Json(items))
}

/// Create an inventory item
pub async fn create_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Json(input): Json<NewInventoryItem>,
) -> AppResult<Json<ItemView>> {
    let item = service(state).create_item(patient_id, input).await?;
    Ok(Json(item))
}

/// Get one inventory item
pub async fn get_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((patient_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ItemView>> {
    let item = service(state).get_item(patient_id, item_id).await?;
    Ok(Json(item))
}

/// Update an item's configuration
pub async fn update_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((patient_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateInventoryItem>,
) -> AppResult<Json<ItemView>> {
    let item = service(state)
        .update_item(patient_id, item_id, input)
        .await?;
    Ok(Json(item))
}

/// Apply a stock movement to an item
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((patient_id, item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<MovementRequest>,
) -> AppResult<Json<MovementResult>> {
    if request.kind == MovementKind::Ajuste {
        check_permission(&current_user.0, "inventory", "adjust")?;
    }

    let result = service(state)
        .record_movement(patient_id, item_id, &current_user.0.actor(), request)
        .await?;
    Ok(Json(result))
}

/// Ledger of one item, newest first
pub async fn list_item_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((patient_id, item_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Vec<MovementRecord>>> {
    let movements = service(state)
        .list_movements(patient_id, Some(item_id), query.limit)
        .await?;
    Ok(Json(movements))
}

/// Ledger of every item of a patient, newest first
pub async fn list_patient_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Vec<MovementRecord>>> {
    let movements = service(state)
        .list_movements(patient_id, None, query.limit)
        .await?;
    Ok(Json(movements))
}

/// Items with a pool at or below its minimum
pub async fn list_inventory_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> AppResult<Json<Vec<ItemView>>> {
    let alerts = service(state).stock_alerts(patient_id).await?;
    Ok(Json(alerts))
}
