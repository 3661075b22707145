//! WebAssembly module for the Carestock platform
//!
//! Provides client-side computation for:
//! - Stock status coloring
//! - Shelf-life decay projections
//! - Movement previews before submitting a form

use chrono::Utc;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Status of a pool against its minimum: "ok", "low" or "critical"
#[wasm_bindgen]
pub fn stock_status(quantity: f64, minimum: f64) -> String {
    match classify_stock(to_decimal(quantity), to_decimal(minimum)) {
        StockStatus::Ok => "ok",
        StockStatus::Low => "low",
        StockStatus::Critical => "critical",
        StockStatus::NotApplicable => "not_applicable",
    }
    .to_string()
}

/// Daily consumption percentage for a shelf life in days
#[wasm_bindgen]
pub fn daily_consumption_rate(shelf_life_days: u32) -> f64 {
    to_f64(daily_consumption_percent(shelf_life_days))
}

/// Longest projection window, in days (ten years)
const HORIZON_DAYS: u32 = 3650;

fn decay_once(remaining: Decimal, rate: Decimal) -> Decimal {
    (remaining - daily_consumption(remaining, rate)).max(Decimal::ZERO)
}

/// Operational percentage left after `days` nightly decay passes
#[wasm_bindgen]
pub fn project_operational_percent(current: f64, daily_percent: f64, days: u32) -> f64 {
    let rate = to_decimal(daily_percent);
    let mut remaining = to_decimal(current).max(Decimal::ZERO);
    for _ in 0..days {
        remaining = decay_once(remaining, rate);
    }
    to_f64(remaining)
}

/// Projected operational percentage for today and each of the next `days` days
///
/// `days` is capped at ten years.
#[wasm_bindgen]
pub fn decay_curve(current: f64, daily_percent: f64, days: u32) -> Vec<f64> {
    let days = days.min(HORIZON_DAYS);
    let rate = to_decimal(daily_percent);
    let mut remaining = to_decimal(current).max(Decimal::ZERO);
    let mut curve = Vec::with_capacity(days as usize + 1);
    curve.push(to_f64(remaining));
    for _ in 0..days {
        remaining = decay_once(remaining, rate);
        curve.push(to_f64(remaining));
    }
    curve
}

/// Days until the operational percentage falls below `threshold`
///
/// Returns -1 when it never does within ten years (decay is asymptotic).
#[wasm_bindgen]
pub fn days_until_below(current: f64, daily_percent: f64, threshold: f64) -> i32 {
    let rate = to_decimal(daily_percent);
    let threshold = to_decimal(threshold);
    let mut remaining = to_decimal(current).max(Decimal::ZERO);
    if remaining < threshold {
        return 0;
    }
    if rate <= Decimal::ZERO {
        return -1;
    }
    for day in 1..=HORIZON_DAYS {
        remaining = decay_once(remaining, rate);
        if remaining < threshold {
            return day as i32;
        }
    }
    -1
}

/// Apply a movement to an item without persisting it
///
/// Takes the item and request as JSON and returns the resulting
/// `{ item, record }` as JSON, or the rejection message.
pub fn preview_movement_json(item_json: &str, request_json: &str) -> Result<String, String> {
    let item: InventoryItem =
        serde_json::from_str(item_json).map_err(|e| format!("Invalid item JSON: {}", e))?;
    let request: MovementRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid movement JSON: {}", e))?;

    let now = Utc::now();
    let preview_actor = Actor::new("preview", "preview");
    let applied = item
        .apply_movement(&request, &preview_actor, now.date_naive(), now)
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&applied).map_err(|e| e.to_string())
}

/// JavaScript entry point for [`preview_movement_json`]
#[wasm_bindgen]
pub fn preview_movement(item_json: &str, request_json: &str) -> Result<String, JsValue> {
    preview_movement_json(item_json, request_json).map_err(|e| JsValue::from_str(&e))
}

/// Validate an "HH:MM" time for schedule forms
#[wasm_bindgen]
pub fn is_valid_time_of_day(time: &str) -> bool {
    validate_time_of_day(time).is_ok()
}
