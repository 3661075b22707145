//! Shelf-life decay applied once per day to perishable items

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{InventoryItem, Location, MovementDraft, MovementRecord, MovementType, FULL_PERCENT};
use crate::types::Actor;

/// Why an item was left untouched by a decay pass
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecaySkip {
    NoShelfLife,
    Depleted,
    NoConsumptionRate,
    NotStarted,
    /// Decay for this date was already committed
    AlreadyApplied,
}

impl DecaySkip {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecaySkip::NoShelfLife => "no_shelf_life",
            DecaySkip::Depleted => "depleted",
            DecaySkip::NoConsumptionRate => "no_consumption_rate",
            DecaySkip::NotStarted => "not_started",
            DecaySkip::AlreadyApplied => "already_applied",
        }
    }
}

impl std::fmt::Display for DecaySkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The effect of one day of decay on one item
#[derive(Debug, Clone, PartialEq)]
pub struct DecayOutcome {
    pub item: InventoryItem,
    pub record: MovementRecord,
    pub consumed: Decimal,
    /// The operational pool reached zero and the decay clock was reset
    pub depleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecayStep {
    Applied(DecayOutcome),
    Skipped(DecaySkip),
}

/// Percentage points consumed in one day
pub fn daily_consumption(operational_qty: Decimal, daily_percent: Decimal) -> Decimal {
    operational_qty * daily_percent / FULL_PERCENT
}

/// Ledger note for an automatic consumption entry
pub fn decay_reason(daily_percent: Decimal) -> String {
    format!(
        "Consumo automático diario ({}% por día)",
        daily_percent.round_dp(2).normalize()
    )
}

impl InventoryItem {
    /// Why this item would be skipped by a decay pass for `today`, if at all
    pub fn decay_skip_reason(&self, today: NaiveDate) -> Option<DecaySkip> {
        if !self.has_shelf_life {
            Some(DecaySkip::NoShelfLife)
        } else if self.operational_qty <= Decimal::ZERO {
            Some(DecaySkip::Depleted)
        } else if self.daily_consumption_percent <= Decimal::ZERO {
            Some(DecaySkip::NoConsumptionRate)
        } else if self.consumption_start_date.is_none() {
            Some(DecaySkip::NotStarted)
        } else if self.last_decay_on.is_some_and(|last| last >= today) {
            Some(DecaySkip::AlreadyApplied)
        } else {
            None
        }
    }

    /// Apply one day of shelf-life consumption to the operational pool
    pub fn apply_daily_decay(&self, today: NaiveDate, now: DateTime<Utc>) -> DecayStep {
        if let Some(skip) = self.decay_skip_reason(today) {
            return DecayStep::Skipped(skip);
        }

        let consumed = daily_consumption(self.operational_qty, self.daily_consumption_percent);
        let remaining = (self.operational_qty - consumed).max(Decimal::ZERO);
        let depleted = remaining <= Decimal::ZERO;

        let mut item = self.clone();
        item.operational_qty = remaining;
        item.updated_at = now;
        item.last_decay_on = Some(today);
        if depleted {
            item.consumption_start_date = None;
        }

        let draft = MovementDraft {
            movement_type: MovementType::ConsumoAutomatico,
            origin: Location::Operativo,
            destination: Location::Consumido,
            quantity: consumed,
            reason: Some(decay_reason(self.daily_consumption_percent)),
        };
        let record = MovementRecord::record(&item, draft, &Actor::system(), today, now);

        DecayStep::Applied(DecayOutcome {
            item,
            record,
            consumed,
            depleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::test_support::*;
    use proptest::prelude::*;

    fn applied(step: DecayStep) -> DecayOutcome {
        match step {
            DecayStep::Applied(outcome) => outcome,
            DecayStep::Skipped(skip) => panic!("unexpected skip: {}", skip),
        }
    }

    #[test]
    fn test_decay_fifty_day_item() {
        let item = perishable(50, "0", "60");
        let outcome = applied(item.apply_daily_decay(today(), now()));

        assert_eq!(outcome.consumed, dec("1.2"));
        assert_eq!(outcome.item.operational_qty, dec("58.8"));
        assert!(!outcome.depleted);
        assert!(outcome.item.consumption_start_date.is_some());
        assert_eq!(outcome.item.last_decay_on, Some(today()));

        let record = outcome.record;
        assert_eq!(record.movement_type, MovementType::ConsumoAutomatico);
        assert_eq!(record.origin, Location::Operativo);
        assert_eq!(record.destination, Location::Consumido);
        assert_eq!(record.quantity, dec("1.2"));
        assert_eq!(record.user_id, "sistema");
        assert_eq!(record.user_name, "Sistema (Vida Útil)");
        assert_eq!(
            record.reason.as_deref(),
            Some("Consumo automático diario (2% por día)")
        );
    }

    #[test]
    fn test_decay_approaches_zero_without_crossing() {
        let mut item = perishable(50, "0", "60");
        let mut day = today();
        while item.operational_qty >= dec("2") {
            item = applied(item.apply_daily_decay(day, now())).item;
            day = day.succ_opt().unwrap();
        }
        let before = item.operational_qty;
        let outcome = applied(item.apply_daily_decay(day, now()));
        assert!(outcome.consumed < before);
        assert!(outcome.item.operational_qty > Decimal::ZERO);
        assert!(outcome.item.operational_qty < before);
    }

    #[test]
    fn test_single_day_shelf_life_depletes_and_clears_clock() {
        let item = perishable(1, "0", "100");
        let outcome = applied(item.apply_daily_decay(today(), now()));

        assert_eq!(outcome.item.operational_qty, Decimal::ZERO);
        assert!(outcome.depleted);
        assert_eq!(outcome.item.consumption_start_date, None);
        assert_eq!(outcome.record.quantity, dec("100"));
    }

    #[test]
    fn test_skip_reasons() {
        let plain = consumable("1", "0", "5");
        assert_eq!(
            plain.apply_daily_decay(today(), now()),
            DecayStep::Skipped(DecaySkip::NoShelfLife)
        );

        let empty = perishable(10, "1", "0");
        assert_eq!(empty.decay_skip_reason(today()), Some(DecaySkip::Depleted));

        let mut unstarted = perishable(10, "1", "50");
        unstarted.consumption_start_date = None;
        assert_eq!(unstarted.decay_skip_reason(today()), Some(DecaySkip::NotStarted));

        let mut no_rate = perishable(10, "1", "50");
        no_rate.daily_consumption_percent = Decimal::ZERO;
        assert_eq!(
            no_rate.decay_skip_reason(today()),
            Some(DecaySkip::NoConsumptionRate)
        );
    }

    #[test]
    fn test_second_pass_same_day_is_skipped() {
        let item = perishable(10, "0", "80");
        let once = applied(item.apply_daily_decay(today(), now())).item;
        assert_eq!(
            once.apply_daily_decay(today(), now()),
            DecayStep::Skipped(DecaySkip::AlreadyApplied)
        );

        let tomorrow = today().succ_opt().unwrap();
        assert!(matches!(
            once.apply_daily_decay(tomorrow, now()),
            DecayStep::Applied(_)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// One pass yields max(0, Q - Q*p/100), strictly below Q
        #[test]
        fn prop_decay_is_monotonic(
            quantity in 1i64..=1000,
            shelf_life_days in 1u32..=365
        ) {
            let q = Decimal::new(quantity, 1);
            let item = perishable(shelf_life_days, "0", &q.to_string());
            let p = item.daily_consumption_percent;
            let outcome = applied(item.apply_daily_decay(today(), now()));

            let expected = (q - q * p / Decimal::ONE_HUNDRED).max(Decimal::ZERO);
            prop_assert_eq!(outcome.item.operational_qty, expected);
            prop_assert!(outcome.item.operational_qty < q);
            prop_assert!(outcome.item.operational_qty >= Decimal::ZERO);
            if outcome.item.operational_qty == Decimal::ZERO {
                prop_assert!(outcome.item.consumption_start_date.is_none());
            }
        }
    }
}
