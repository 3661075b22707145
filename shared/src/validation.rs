//! Validation utilities for the Carestock platform
//!
//! Field-level limits live on the input types as `validator` derives; the
//! checks here cover rules that span several fields.

use rust_decimal::Decimal;

use crate::models::{NewInventoryItem, FULL_PERCENT, MAX_QUANTITY};

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate the cross-field rules of the "new item" form
pub fn validate_new_item(input: &NewInventoryItem) -> Result<(), &'static str> {
    let quantities = [
        input.master_qty,
        input.transit_qty,
        input.operational_qty,
        input.min_master,
        input.min_transit,
        input.min_operational,
    ];
    if quantities.iter().any(|q| *q < Decimal::ZERO) {
        return Err("Quantities and thresholds cannot be negative");
    }
    if quantities.iter().any(|q| *q > MAX_QUANTITY) {
        return Err("Quantities and thresholds exceed the supported maximum");
    }
    if input.has_shelf_life && input.shelf_life_days.unwrap_or(0) == 0 {
        return Err("Shelf life days are required for items with a shelf life");
    }
    if input.has_shelf_life && input.operational_qty > FULL_PERCENT {
        return Err("Operational stock of a perishable item is a percentage (0-100)");
    }
    if !input.linked_to_pillbox && input.transit_qty > Decimal::ZERO {
        return Err("Transit stock requires the item to be linked to the pillbox");
    }
    Ok(())
}

/// Validate a minimum threshold
pub fn validate_threshold(threshold: Decimal) -> Result<(), &'static str> {
    if threshold < Decimal::ZERO {
        return Err("Thresholds cannot be negative");
    }
    if threshold > MAX_QUANTITY {
        return Err("Threshold exceeds the supported maximum");
    }
    Ok(())
}

// ============================================================================
// Scheduling Validations
// ============================================================================

/// Validate a time of day in 24-hour "HH:MM" form
pub fn validate_time_of_day(time: &str) -> Result<(), &'static str> {
    let (hours, minutes) = time.split_once(':').ok_or("Time must be in HH:MM format")?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err("Time must be in HH:MM format");
    }
    let hours: u8 = hours.parse().map_err(|_| "Invalid hour")?;
    let minutes: u8 = minutes.parse().map_err(|_| "Invalid minute")?;
    if hours > 23 {
        return Err("Hour must be between 00 and 23");
    }
    if minutes > 59 {
        return Err("Minute must be between 00 and 59");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemCategory;

    fn form() -> NewInventoryItem {
        NewInventoryItem {
            name: "Insulina glargina".to_string(),
            category: ItemCategory::Medication,
            unit: "pluma".to_string(),
            master_qty: Decimal::from(3),
            transit_qty: Decimal::ZERO,
            operational_qty: Decimal::from(100),
            min_master: Decimal::ONE,
            min_transit: Decimal::ZERO,
            min_operational: Decimal::from(20),
            has_shelf_life: true,
            shelf_life_days: Some(28),
            linked_to_pillbox: false,
        }
    }

    #[test]
    fn test_validate_new_item_valid() {
        assert!(validate_new_item(&form()).is_ok());
    }

    #[test]
    fn test_validate_new_item_negative_quantity() {
        let mut input = form();
        input.master_qty = Decimal::from(-1);
        assert!(validate_new_item(&input).is_err());
    }

    #[test]
    fn test_validate_new_item_missing_shelf_life_days() {
        let mut input = form();
        input.shelf_life_days = None;
        assert!(validate_new_item(&input).is_err());
    }

    #[test]
    fn test_validate_new_item_percentage_bound() {
        let mut input = form();
        input.operational_qty = Decimal::from(101);
        assert!(validate_new_item(&input).is_err());
    }

    #[test]
    fn test_validate_new_item_transit_requires_pillbox() {
        let mut input = form();
        input.transit_qty = Decimal::ONE;
        assert!(validate_new_item(&input).is_err());
        input.linked_to_pillbox = true;
        assert!(validate_new_item(&input).is_ok());
    }

    #[test]
    fn test_validate_new_item_upper_bound() {
        let mut input = form();
        input.master_qty = Decimal::MAX;
        assert!(validate_new_item(&input).is_err());
        input.master_qty = MAX_QUANTITY;
        assert!(validate_new_item(&input).is_ok());
    }

    #[test]
    fn test_validate_threshold() {
        assert!(validate_threshold(Decimal::ZERO).is_ok());
        assert!(validate_threshold(Decimal::from(-2)).is_err());
        assert!(validate_threshold(Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_time_of_day() {
        assert!(validate_time_of_day("00:00").is_ok());
        assert!(validate_time_of_day("08:30").is_ok());
        assert!(validate_time_of_day("23:59").is_ok());
        assert!(validate_time_of_day("24:00").is_err());
        assert!(validate_time_of_day("8:30").is_err());
        assert!(validate_time_of_day("08:60").is_err());
        assert!(validate_time_of_day("0830").is_err());
        assert!(validate_time_of_day("ab:cd").is_err());
    }
}
