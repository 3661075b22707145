//! Inventory models: items, stock pools and the movement state machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::{Location, MovementDraft, MovementRecord, MovementType};
use crate::types::Actor;

/// Operational value of a decaying item when a fresh unit enters consumption
pub const FULL_PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Largest value a pool, threshold or single movement may hold
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Category of a stocked good
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    #[serde(alias = "medicamento")]
    Medication,
    Material,
    #[serde(alias = "consumible")]
    Consumable,
}

/// One of the three quantity pools of an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Pool {
    /// Bulk stock held in storage
    #[serde(rename = "maestro")]
    Master,
    /// Stock staged in the pillbox tier
    #[serde(rename = "transito")]
    Transit,
    /// Stock in active use
    #[serde(rename = "operativo")]
    Operational,
}

impl Pool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pool::Master => "maestro",
            Pool::Transit => "transito",
            Pool::Operational => "operativo",
        }
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Pool> for Location {
    fn from(pool: Pool) -> Self {
        match pool {
            Pool::Master => Location::Maestro,
            Pool::Transit => Location::Transito,
            Pool::Operational => Location::Operativo,
        }
    }
}

/// Display status of a pool against its minimum threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Ok,
    Low,
    Critical,
    /// Transit pool of an item that is not linked to the pillbox
    NotApplicable,
}

/// Classify a pool quantity against its minimum
pub fn classify_stock(quantity: Decimal, minimum: Decimal) -> StockStatus {
    if quantity <= Decimal::ZERO {
        StockStatus::Critical
    } else if quantity <= minimum {
        StockStatus::Low
    } else {
        StockStatus::Ok
    }
}

/// Status of every pool of an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStatus {
    pub master: StockStatus,
    pub transit: StockStatus,
    pub operational: StockStatus,
}

impl PoolStatus {
    /// Worst status across the applicable pools
    pub fn worst(&self) -> StockStatus {
        [self.master, self.transit, self.operational]
            .into_iter()
            .filter(|s| *s != StockStatus::NotApplicable)
            .max()
            .unwrap_or(StockStatus::Ok)
    }

    pub fn needs_attention(&self) -> bool {
        self.worst() != StockStatus::Ok
    }
}

/// Daily consumption rate for a shelf life, in percent per day
pub fn daily_consumption_percent(shelf_life_days: u32) -> Decimal {
    if shelf_life_days == 0 {
        return Decimal::ZERO;
    }
    FULL_PERCENT / Decimal::from(shelf_life_days)
}

fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// A stocked good with Master, Transit and Operational pools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub category: ItemCategory,
    pub unit: String,

    pub master_qty: Decimal,
    pub transit_qty: Decimal,
    /// Units, or percent remaining (0-100) when the item has a shelf life
    pub operational_qty: Decimal,

    pub min_master: Decimal,
    pub min_transit: Decimal,
    pub min_operational: Decimal,

    pub has_shelf_life: bool,
    pub shelf_life_days: u32,
    /// Always `100 / shelf_life_days` for decaying items, zero otherwise
    pub daily_consumption_percent: Decimal,
    /// Set when the item enters consumption, cleared when fully consumed
    pub consumption_start_date: Option<DateTime<Utc>>,
    /// Facility date the daily decay was last applied
    #[serde(default)]
    pub last_decay_on: Option<NaiveDate>,

    pub linked_to_pillbox: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for the "new item" form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInventoryItem {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub category: ItemCategory,
    #[serde(default)]
    #[validate(length(max = 40))]
    pub unit: String,
    #[serde(default)]
    pub master_qty: Decimal,
    #[serde(default)]
    pub transit_qty: Decimal,
    #[serde(default)]
    pub operational_qty: Decimal,
    #[serde(default)]
    pub min_master: Decimal,
    #[serde(default)]
    pub min_transit: Decimal,
    #[serde(default)]
    pub min_operational: Decimal,
    #[serde(default)]
    pub has_shelf_life: bool,
    #[validate(range(min = 1, max = 3650))]
    pub shelf_life_days: Option<u32>,
    #[serde(default)]
    pub linked_to_pillbox: bool,
}

/// Editable item configuration; quantities only change through movements
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateInventoryItem {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    #[validate(length(max = 40))]
    pub unit: Option<String>,
    pub min_master: Option<Decimal>,
    pub min_transit: Option<Decimal>,
    pub min_operational: Option<Decimal>,
    pub has_shelf_life: Option<bool>,
    #[validate(range(min = 1, max = 3650))]
    pub shelf_life_days: Option<u32>,
    pub linked_to_pillbox: Option<bool>,
}

impl InventoryItem {
    /// Build an item from the creation form
    ///
    /// A decaying item created with operational stock starts its decay
    /// clock immediately.
    pub fn new(patient_id: Uuid, input: NewInventoryItem, now: DateTime<Utc>) -> Self {
        let has_shelf_life = input.has_shelf_life && input.shelf_life_days.unwrap_or(0) > 0;
        let mut item = Self {
            id: Uuid::new_v4(),
            patient_id,
            name: input.name.trim().to_string(),
            category: input.category,
            unit: input.unit.trim().to_string(),
            master_qty: input.master_qty,
            transit_qty: input.transit_qty,
            operational_qty: input.operational_qty,
            min_master: input.min_master,
            min_transit: input.min_transit,
            min_operational: input.min_operational,
            has_shelf_life,
            shelf_life_days: input.shelf_life_days.unwrap_or(0),
            daily_consumption_percent: Decimal::ZERO,
            consumption_start_date: None,
            last_decay_on: None,
            linked_to_pillbox: input.linked_to_pillbox,
            created_at: now,
            updated_at: now,
        };
        item.normalize();
        if item.has_shelf_life && item.operational_qty > Decimal::ZERO {
            item.consumption_start_date = Some(now);
        }
        item
    }

    /// Apply configuration edits
    pub fn apply_update(
        &mut self,
        update: UpdateInventoryItem,
        now: DateTime<Utc>,
    ) -> Result<(), &'static str> {
        if update.linked_to_pillbox == Some(false) && self.transit_qty > Decimal::ZERO {
            return Err("Transit stock must be empty before unlinking the pillbox");
        }
        let has_shelf_life = update.has_shelf_life.unwrap_or(self.has_shelf_life);
        let shelf_life_days = update.shelf_life_days.unwrap_or(self.shelf_life_days);
        if has_shelf_life && shelf_life_days == 0 {
            return Err("Shelf life days are required for items with a shelf life");
        }
        // Units and percentages are not interchangeable
        if has_shelf_life != self.has_shelf_life && self.operational_qty > Decimal::ZERO {
            return Err("Operational stock must be empty before changing the shelf-life setting");
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(unit) = update.unit {
            self.unit = unit.trim().to_string();
        }
        if let Some(min) = update.min_master {
            self.min_master = non_negative(min);
        }
        if let Some(min) = update.min_transit {
            self.min_transit = non_negative(min);
        }
        if let Some(min) = update.min_operational {
            self.min_operational = non_negative(min);
        }
        if let Some(linked) = update.linked_to_pillbox {
            self.linked_to_pillbox = linked;
        }
        self.has_shelf_life = has_shelf_life;
        self.shelf_life_days = shelf_life_days;
        self.updated_at = now;
        // Pools are left alone; only movements change quantities
        self.sync_shelf_life();
        Ok(())
    }

    /// Re-establish the item invariants after a write
    pub fn normalize(&mut self) {
        self.master_qty = non_negative(self.master_qty);
        self.transit_qty = non_negative(self.transit_qty);
        self.operational_qty = self.clamp_operational(self.operational_qty);
        self.min_master = non_negative(self.min_master);
        self.min_transit = non_negative(self.min_transit);
        self.min_operational = non_negative(self.min_operational);
        self.sync_shelf_life();
    }

    /// Re-derive the consumption rate and decay clock from the shelf-life settings
    fn sync_shelf_life(&mut self) {
        if self.has_shelf_life && self.shelf_life_days > 0 {
            self.daily_consumption_percent = daily_consumption_percent(self.shelf_life_days);
        } else {
            self.has_shelf_life = false;
            self.shelf_life_days = 0;
            self.daily_consumption_percent = Decimal::ZERO;
            self.consumption_start_date = None;
            self.last_decay_on = None;
        }

        if self.operational_qty <= Decimal::ZERO {
            self.consumption_start_date = None;
        }
    }

    /// Whether the operational pool is a percentage that decays over time
    pub fn is_decaying(&self) -> bool {
        self.has_shelf_life
    }

    pub fn pool_qty(&self, pool: Pool) -> Decimal {
        match pool {
            Pool::Master => self.master_qty,
            Pool::Transit => self.transit_qty,
            Pool::Operational => self.operational_qty,
        }
    }

    fn set_pool(&mut self, pool: Pool, value: Decimal) {
        match pool {
            Pool::Master => self.master_qty = non_negative(value),
            Pool::Transit => self.transit_qty = non_negative(value),
            Pool::Operational => self.operational_qty = self.clamp_operational(value),
        }
    }

    fn clamp_operational(&self, value: Decimal) -> Decimal {
        let value = non_negative(value);
        if self.has_shelf_life {
            value.min(FULL_PERCENT)
        } else {
            value
        }
    }

    /// Status of every pool against its minimum
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            master: classify_stock(self.master_qty, self.min_master),
            transit: if self.linked_to_pillbox {
                classify_stock(self.transit_qty, self.min_transit)
            } else {
                StockStatus::NotApplicable
            },
            operational: classify_stock(self.operational_qty, self.min_operational),
        }
    }

    /// Validate and apply one movement
    ///
    /// Returns the updated item together with its ledger entry. On error
    /// nothing is produced and `self` is untouched.
    pub fn apply_movement(
        &self,
        request: &MovementRequest,
        actor: &Actor,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AppliedMovement, MovementError> {
        let quantity = request.quantity;
        let mut item = self.clone();

        let (movement_type, origin, destination, recorded) = match request.kind {
            MovementKind::Entrada => {
                require_positive(quantity)?;
                let total = checked_total(item.master_qty, quantity)?;
                item.set_pool(Pool::Master, total);
                (MovementType::Entrada, Location::Externo, Location::Maestro, quantity)
            }
            MovementKind::Salida => {
                require_positive(quantity)?;
                require_in_range(quantity)?;
                require_available(Pool::Operational, quantity, item.operational_qty)?;
                item.set_pool(Pool::Operational, item.operational_qty - quantity);
                (MovementType::Salida, Location::Operativo, Location::Consumido, quantity)
            }
            MovementKind::Transferencia {
                origin,
                destination,
            } => {
                require_positive(quantity)?;
                require_in_range(quantity)?;
                let route = Route::between(origin, destination)?;
                item.transfer(route, quantity, now)?;
                (
                    MovementType::Transferencia,
                    origin.into(),
                    destination.into(),
                    quantity,
                )
            }
            MovementKind::Ajuste => {
                if quantity < Decimal::ZERO {
                    return Err(MovementError::NegativeAdjustment);
                }
                require_in_range(quantity)?;
                item.set_pool(Pool::Operational, quantity);
                (
                    MovementType::Ajuste,
                    Location::Operativo,
                    Location::Operativo,
                    item.operational_qty,
                )
            }
        };

        if item.is_decaying() && item.operational_qty <= Decimal::ZERO {
            item.consumption_start_date = None;
        }
        item.updated_at = now;

        let draft = MovementDraft {
            movement_type,
            origin,
            destination,
            quantity: recorded,
            reason: request.reason.clone(),
        };
        let record = MovementRecord::record(&item, draft, actor, today, now);
        Ok(AppliedMovement { item, record })
    }

    fn transfer(
        &mut self,
        route: Route,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), MovementError> {
        if route.uses_transit() && !self.linked_to_pillbox {
            return Err(MovementError::PoolNotLinked);
        }
        let origin = route.origin();
        let available = self.pool_qty(origin);
        require_available(origin, quantity, available)?;
        self.set_pool(origin, available - quantity);

        match route {
            Route::MasterToTransit => {
                let total = checked_total(self.transit_qty, quantity)?;
                self.set_pool(Pool::Transit, total);
            }
            Route::MasterToOperational | Route::TransitToOperational => {
                if self.is_decaying() {
                    self.operational_qty = FULL_PERCENT;
                    if self.consumption_start_date.is_none() {
                        self.consumption_start_date = Some(now);
                    }
                } else {
                    let total = checked_total(self.operational_qty, quantity)?;
                    self.set_pool(Pool::Operational, total);
                }
            }
        }
        Ok(())
    }
}

/// Legal transfer routes between pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    MasterToTransit,
    MasterToOperational,
    TransitToOperational,
}

impl Route {
    fn between(origin: Pool, destination: Pool) -> Result<Self, MovementError> {
        match (origin, destination) {
            (Pool::Master, Pool::Transit) => Ok(Route::MasterToTransit),
            (Pool::Master, Pool::Operational) => Ok(Route::MasterToOperational),
            (Pool::Transit, Pool::Operational) => Ok(Route::TransitToOperational),
            _ => Err(MovementError::InvalidRoute {
                origin,
                destination,
            }),
        }
    }

    fn origin(&self) -> Pool {
        match self {
            Route::MasterToTransit | Route::MasterToOperational => Pool::Master,
            Route::TransitToOperational => Pool::Transit,
        }
    }

    fn uses_transit(&self) -> bool {
        !matches!(self, Route::MasterToOperational)
    }
}

fn require_positive(quantity: Decimal) -> Result<(), MovementError> {
    if quantity <= Decimal::ZERO {
        return Err(MovementError::NonPositiveQuantity);
    }
    Ok(())
}

fn require_in_range(quantity: Decimal) -> Result<(), MovementError> {
    if quantity > MAX_QUANTITY {
        return Err(MovementError::QuantityOutOfRange);
    }
    Ok(())
}

/// Sum of a pool and an incoming quantity, bounded by [`MAX_QUANTITY`]
fn checked_total(current: Decimal, quantity: Decimal) -> Result<Decimal, MovementError> {
    current
        .checked_add(quantity)
        .filter(|total| *total <= MAX_QUANTITY)
        .ok_or(MovementError::QuantityOutOfRange)
}

fn require_available(pool: Pool, requested: Decimal, available: Decimal) -> Result<(), MovementError> {
    if requested > available {
        return Err(MovementError::InsufficientStock {
            pool,
            requested,
            available,
        });
    }
    Ok(())
}

/// A user-initiated movement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementRequest {
    #[serde(flatten)]
    pub kind: MovementKind,
    pub quantity: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

impl MovementRequest {
    pub fn entrada(quantity: Decimal) -> Self {
        Self::new(MovementKind::Entrada, quantity)
    }

    pub fn salida(quantity: Decimal) -> Self {
        Self::new(MovementKind::Salida, quantity)
    }

    pub fn transferencia(origin: Pool, destination: Pool, quantity: Decimal) -> Self {
        Self::new(
            MovementKind::Transferencia {
                origin,
                destination,
            },
            quantity,
        )
    }

    pub fn ajuste(quantity: Decimal) -> Self {
        Self::new(MovementKind::Ajuste, quantity)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn new(kind: MovementKind, quantity: Decimal) -> Self {
        Self {
            kind,
            quantity,
            reason: None,
        }
    }

    pub fn movement_type(&self) -> MovementType {
        match self.kind {
            MovementKind::Entrada => MovementType::Entrada,
            MovementKind::Salida => MovementType::Salida,
            MovementKind::Transferencia { .. } => MovementType::Transferencia,
            MovementKind::Ajuste => MovementType::Ajuste,
        }
    }
}

/// Movement kinds a user can request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovementKind {
    Entrada,
    Salida,
    Transferencia { origin: Pool, destination: Pool },
    Ajuste,
}

/// Result of a successful movement: new item state plus its ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedMovement {
    pub item: InventoryItem,
    pub record: MovementRecord,
}

/// Reasons a movement is rejected before any mutation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MovementError {
    #[error("Insufficient stock in {pool}: requested {requested}, available {available}")]
    InsufficientStock {
        pool: Pool,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Adjusted quantity cannot be negative")]
    NegativeAdjustment,

    #[error("Quantity exceeds the supported maximum of {}", MAX_QUANTITY)]
    QuantityOutOfRange,

    #[error("Cannot transfer from {origin} to {destination}")]
    InvalidRoute { origin: Pool, destination: Pool },

    #[error("Item is not linked to the pillbox; the transit pool is unavailable")]
    PoolNotLinked,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    pub fn consumable(master: &str, transit: &str, operational: &str) -> InventoryItem {
        InventoryItem::new(
            Uuid::new_v4(),
            NewInventoryItem {
                name: "Gasas estériles".to_string(),
                category: ItemCategory::Consumable,
                unit: "pzas".to_string(),
                master_qty: dec(master),
                transit_qty: dec(transit),
                operational_qty: dec(operational),
                min_master: dec("5"),
                min_transit: dec("2"),
                min_operational: dec("2"),
                has_shelf_life: false,
                shelf_life_days: None,
                linked_to_pillbox: true,
            },
            now(),
        )
    }

    pub fn perishable(shelf_life_days: u32, master: &str, operational: &str) -> InventoryItem {
        InventoryItem::new(
            Uuid::new_v4(),
            NewInventoryItem {
                name: "Jarabe para la tos".to_string(),
                category: ItemCategory::Medication,
                unit: "frasco".to_string(),
                master_qty: dec(master),
                transit_qty: Decimal::ZERO,
                operational_qty: dec(operational),
                min_master: dec("1"),
                min_transit: Decimal::ZERO,
                min_operational: dec("20"),
                has_shelf_life: true,
                shelf_life_days: Some(shelf_life_days),
                linked_to_pillbox: false,
            },
            now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use proptest::prelude::*;

    fn apply(item: &InventoryItem, request: MovementRequest) -> Result<AppliedMovement, MovementError> {
        item.apply_movement(&request, &Actor::new("u1", "Ana"), today(), now())
    }

    #[test]
    fn test_entrada_adds_to_master() {
        let item = consumable("10", "0", "0");
        let applied = apply(&item, MovementRequest::entrada(dec("5"))).unwrap();

        assert_eq!(applied.item.master_qty, dec("15"));
        assert_eq!(applied.record.origin, Location::Externo);
        assert_eq!(applied.record.destination, Location::Maestro);
        assert_eq!(applied.record.quantity, dec("5"));
        assert_eq!(applied.record.user_name, "Ana");
    }

    #[test]
    fn test_salida_rejected_when_insufficient() {
        let item = consumable("0", "0", "3");
        let err = apply(&item, MovementRequest::salida(dec("5"))).unwrap_err();

        assert_eq!(
            err,
            MovementError::InsufficientStock {
                pool: Pool::Operational,
                requested: dec("5"),
                available: dec("3"),
            }
        );
        assert_eq!(item.operational_qty, dec("3"));
    }

    #[test]
    fn test_salida_consumes_operational() {
        let item = consumable("0", "0", "3");
        let applied = apply(&item, MovementRequest::salida(dec("3"))).unwrap();

        assert_eq!(applied.item.operational_qty, Decimal::ZERO);
        assert_eq!(applied.record.destination, Location::Consumido);
    }

    #[test]
    fn test_transfer_master_to_operational_non_decaying() {
        let item = consumable("10", "0", "1");
        let applied = apply(
            &item,
            MovementRequest::transferencia(Pool::Master, Pool::Operational, dec("4")),
        )
        .unwrap();

        assert_eq!(applied.item.master_qty, dec("6"));
        assert_eq!(applied.item.operational_qty, dec("5"));
        assert_eq!(applied.item.consumption_start_date, None);
        assert_eq!(applied.record.quantity, dec("4"));
    }

    #[test]
    fn test_transfer_through_pillbox() {
        let item = consumable("10", "0", "0");
        let staged = apply(
            &item,
            MovementRequest::transferencia(Pool::Master, Pool::Transit, dec("7")),
        )
        .unwrap()
        .item;
        assert_eq!(staged.master_qty, dec("3"));
        assert_eq!(staged.transit_qty, dec("7"));

        let applied = apply(
            &staged,
            MovementRequest::transferencia(Pool::Transit, Pool::Operational, dec("2")),
        )
        .unwrap();
        assert_eq!(applied.item.transit_qty, dec("5"));
        assert_eq!(applied.item.operational_qty, dec("2"));
        assert_eq!(applied.record.origin, Location::Transito);
        assert_eq!(applied.record.destination, Location::Operativo);
    }

    #[test]
    fn test_transfer_rejects_unlinked_transit() {
        let mut item = consumable("10", "0", "0");
        item.linked_to_pillbox = false;
        let err = apply(
            &item,
            MovementRequest::transferencia(Pool::Master, Pool::Transit, dec("1")),
        )
        .unwrap_err();
        assert_eq!(err, MovementError::PoolNotLinked);
    }

    #[test]
    fn test_transfer_rejects_invalid_route() {
        let item = consumable("10", "5", "5");
        for (origin, destination) in [
            (Pool::Operational, Pool::Master),
            (Pool::Transit, Pool::Master),
            (Pool::Master, Pool::Master),
        ] {
            let err = apply(
                &item,
                MovementRequest::transferencia(origin, destination, dec("1")),
            )
            .unwrap_err();
            assert!(matches!(err, MovementError::InvalidRoute { .. }));
        }
    }

    #[test]
    fn test_transfer_insufficient_master() {
        let item = consumable("2", "0", "0");
        let err = apply(
            &item,
            MovementRequest::transferencia(Pool::Master, Pool::Operational, dec("3")),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MovementError::InsufficientStock {
                pool: Pool::Master,
                ..
            }
        ));
    }

    #[test]
    fn test_decaying_transfer_resets_to_full_and_starts_clock() {
        let item = perishable(50, "1", "0");
        assert_eq!(item.consumption_start_date, None);

        let applied = apply(
            &item,
            MovementRequest::transferencia(Pool::Master, Pool::Operational, dec("1")),
        )
        .unwrap();

        assert_eq!(applied.item.master_qty, Decimal::ZERO);
        assert_eq!(applied.item.operational_qty, dec("100"));
        assert_eq!(applied.item.consumption_start_date, Some(now()));
        assert_eq!(applied.record.quantity, dec("1"));
    }

    #[test]
    fn test_decaying_transfer_keeps_existing_clock() {
        let mut item = perishable(50, "2", "40");
        let started = now() - chrono::Duration::days(3);
        item.consumption_start_date = Some(started);

        let applied = apply(
            &item,
            MovementRequest::transferencia(Pool::Master, Pool::Operational, dec("1")),
        )
        .unwrap();
        assert_eq!(applied.item.operational_qty, dec("100"));
        assert_eq!(applied.item.consumption_start_date, Some(started));
    }

    #[test]
    fn test_ajuste_sets_absolute_value() {
        let item = consumable("0", "0", "8");
        let applied = apply(&item, MovementRequest::ajuste(dec("3")).with_reason("Conteo")).unwrap();

        assert_eq!(applied.item.operational_qty, dec("3"));
        assert_eq!(applied.record.quantity, dec("3"));
        assert_eq!(applied.record.origin, Location::Operativo);
        assert_eq!(applied.record.destination, Location::Operativo);
        assert_eq!(applied.record.reason.as_deref(), Some("Conteo"));
    }

    #[test]
    fn test_ajuste_clamps_decaying_to_full() {
        let item = perishable(10, "0", "50");
        let applied = apply(&item, MovementRequest::ajuste(dec("140"))).unwrap();
        assert_eq!(applied.item.operational_qty, dec("100"));
        assert_eq!(applied.record.quantity, dec("100"));
    }

    #[test]
    fn test_depleting_decaying_item_clears_clock() {
        let item = perishable(10, "0", "50");
        assert!(item.consumption_start_date.is_some());
        let applied = apply(&item, MovementRequest::ajuste(Decimal::ZERO)).unwrap();
        assert_eq!(applied.item.consumption_start_date, None);
    }

    #[test]
    fn test_rejects_non_positive_quantities() {
        let item = consumable("10", "0", "10");
        assert_eq!(
            apply(&item, MovementRequest::entrada(Decimal::ZERO)).unwrap_err(),
            MovementError::NonPositiveQuantity
        );
        assert_eq!(
            apply(&item, MovementRequest::salida(dec("-1"))).unwrap_err(),
            MovementError::NonPositiveQuantity
        );
        assert_eq!(
            apply(&item, MovementRequest::ajuste(dec("-1"))).unwrap_err(),
            MovementError::NegativeAdjustment
        );
    }

    #[test]
    fn test_new_item_derives_consumption_rate() {
        let item = perishable(50, "0", "60");
        assert_eq!(item.daily_consumption_percent, dec("2"));
        assert_eq!(item.consumption_start_date, Some(now()));

        let plain = consumable("1", "0", "1");
        assert_eq!(plain.daily_consumption_percent, Decimal::ZERO);
        assert_eq!(plain.shelf_life_days, 0);
    }

    #[test]
    fn test_update_rederives_rate_and_guards_transit() {
        let mut item = perishable(50, "0", "60");
        item.apply_update(
            UpdateInventoryItem {
                shelf_life_days: Some(25),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        assert_eq!(item.daily_consumption_percent, dec("4"));

        let mut staged = consumable("0", "3", "0");
        let err = staged
            .apply_update(
                UpdateInventoryItem {
                    linked_to_pillbox: Some(false),
                    ..Default::default()
                },
                now(),
            )
            .unwrap_err();
        assert!(err.contains("Transit"));
    }

    #[test]
    fn test_update_refuses_shelf_life_toggle_with_stock() {
        let mut boxed = consumable("0", "0", "500");
        let err = boxed
            .apply_update(
                UpdateInventoryItem {
                    has_shelf_life: Some(true),
                    shelf_life_days: Some(10),
                    ..Default::default()
                },
                now(),
            )
            .unwrap_err();
        assert!(err.contains("shelf-life"));
        assert_eq!(boxed.operational_qty, dec("500"));
        assert!(!boxed.has_shelf_life);

        let mut opened = perishable(50, "0", "60");
        assert!(opened
            .apply_update(
                UpdateInventoryItem {
                    has_shelf_life: Some(false),
                    ..Default::default()
                },
                now(),
            )
            .is_err());
        assert_eq!(opened.operational_qty, dec("60"));

        // An empty pool may switch between units and percentages
        let mut empty = consumable("4", "0", "0");
        empty
            .apply_update(
                UpdateInventoryItem {
                    has_shelf_life: Some(true),
                    shelf_life_days: Some(10),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();
        assert_eq!(empty.daily_consumption_percent, dec("10"));
        assert_eq!(empty.master_qty, dec("4"));
    }

    #[test]
    fn test_quantity_overflow_is_rejected() {
        let mut full = consumable("0", "0", "0");
        full.master_qty = Decimal::MAX;
        assert_eq!(
            apply(&full, MovementRequest::entrada(Decimal::ONE)).unwrap_err(),
            MovementError::QuantityOutOfRange
        );

        let near_cap = consumable(&(MAX_QUANTITY - Decimal::ONE).to_string(), "0", "0");
        assert!(apply(&near_cap, MovementRequest::entrada(Decimal::ONE)).is_ok());
        assert_eq!(
            apply(&near_cap, MovementRequest::entrada(dec("2"))).unwrap_err(),
            MovementError::QuantityOutOfRange
        );

        let mut crowded = consumable("5", "0", "0");
        crowded.operational_qty = MAX_QUANTITY;
        assert_eq!(
            apply(
                &crowded,
                MovementRequest::transferencia(Pool::Master, Pool::Operational, Decimal::ONE)
            )
            .unwrap_err(),
            MovementError::QuantityOutOfRange
        );
        assert_eq!(
            apply(&crowded, MovementRequest::ajuste(Decimal::MAX)).unwrap_err(),
            MovementError::QuantityOutOfRange
        );
    }

    #[test]
    fn test_pool_status() {
        let item = consumable("5", "0", "10");
        let status = item.status();
        assert_eq!(status.master, StockStatus::Low);
        assert_eq!(status.transit, StockStatus::Critical);
        assert_eq!(status.operational, StockStatus::Ok);
        assert_eq!(status.worst(), StockStatus::Critical);

        let mut unlinked = consumable("50", "0", "10");
        unlinked.linked_to_pillbox = false;
        assert_eq!(unlinked.status().transit, StockStatus::NotApplicable);
        assert!(!unlinked.status().needs_attention());
    }

    #[test]
    fn test_movement_request_json_shape() {
        let json = r#"{"type":"transferencia","origin":"maestro","destination":"operativo","quantity":"4"}"#;
        let request: MovementRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request,
            MovementRequest::transferencia(Pool::Master, Pool::Operational, dec("4"))
        );

        let salida: MovementRequest =
            serde_json::from_str(r#"{"type":"salida","quantity":2,"reason":"toma nocturna"}"#).unwrap();
        assert_eq!(salida.movement_type(), MovementType::Salida);
        assert_eq!(salida.reason.as_deref(), Some("toma nocturna"));
    }

    fn pool_strategy() -> impl Strategy<Value = Pool> {
        prop_oneof![Just(Pool::Master), Just(Pool::Transit), Just(Pool::Operational)]
    }

    fn request_strategy() -> impl Strategy<Value = MovementRequest> {
        let quantity = (0i64..=2000).prop_map(|n| Decimal::new(n, 1));
        (0u8..4, quantity, pool_strategy(), pool_strategy()).prop_map(|(kind, q, origin, destination)| match kind {
            0 => MovementRequest::entrada(q),
            1 => MovementRequest::salida(q),
            2 => MovementRequest::transferencia(origin, destination, q),
            _ => MovementRequest::ajuste(q),
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// No sequence of movements drives a pool negative
        #[test]
        fn prop_pools_never_negative(
            decaying in any::<bool>(),
            requests in prop::collection::vec(request_strategy(), 1..40)
        ) {
            let mut item = if decaying { perishable(30, "3", "0") } else { consumable("3", "0", "0") };
            for request in &requests {
                if let Ok(applied) = apply(&item, request.clone()) {
                    item = applied.item;
                }
                prop_assert!(item.master_qty >= Decimal::ZERO);
                prop_assert!(item.transit_qty >= Decimal::ZERO);
                prop_assert!(item.operational_qty >= Decimal::ZERO);
                if decaying {
                    prop_assert!(item.operational_qty <= FULL_PERCENT);
                }
            }
        }

        /// A rejected movement leaves the item untouched
        #[test]
        fn prop_salida_over_stock_rejected(
            stock in 0i64..1000,
            extra in 1i64..1000
        ) {
            let item = consumable("0", "0", &stock.to_string());
            let result = apply(&item, MovementRequest::salida(Decimal::from(stock + extra)));
            let is_insufficient = matches!(result, Err(MovementError::InsufficientStock { .. }));
            prop_assert!(is_insufficient);
            prop_assert_eq!(item.operational_qty, Decimal::from(stock));
        }

        /// Any positive transfer into a decaying operational pool lands on exactly 100
        #[test]
        fn prop_decaying_transfer_resets_to_full(
            prior in 0i64..=1000,
            quantity in 1i64..=50
        ) {
            let item = perishable(20, "50", &Decimal::new(prior, 1).to_string());
            let applied = apply(
                &item,
                MovementRequest::transferencia(Pool::Master, Pool::Operational, Decimal::from(quantity)),
            ).unwrap();
            prop_assert_eq!(applied.item.operational_qty, FULL_PERCENT);
            prop_assert_eq!(applied.record.quantity, Decimal::from(quantity));
        }
    }
}
