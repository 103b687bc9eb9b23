//! Shelf-life tracking for recently bought perishables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::category::default_shelf_life_days;
use crate::domain::purchase::PurchaseHistory;

pub const RECENT_PURCHASE_DAYS: i64 = 7;
pub const EXPIRY_WARNING_DAYS: i64 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfLifeEntry {
    pub item: String,
    pub category: String,
    pub purchased_at: DateTime<Utc>,
    pub shelf_life_days: u32,
}

impl ShelfLifeEntry {
    /// Whole days left before the item expires. Negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        i64::from(self.shelf_life_days) - (now - self.purchased_at).num_days()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpiringItem<'a> {
    pub entry: &'a ShelfLifeEntry,
    pub days_until_expiry: i64,
}

/// Latest purchase of every item with its resolved shelf life.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationModel {
    pub entries: BTreeMap<String, ShelfLifeEntry>,
}

impl ExpirationModel {
    /// Items bought within the last week that expire in the next few days.
    pub fn expiring(&self, now: DateTime<Utc>) -> Vec<ExpiringItem<'_>> {
        self.entries
            .values()
            .filter(|entry| {
                let age = (now - entry.purchased_at).num_days();
                (0..=RECENT_PURCHASE_DAYS).contains(&age)
            })
            .filter_map(|entry| {
                let days_until_expiry = entry.days_until_expiry(now);
                (0..=EXPIRY_WARNING_DAYS)
                    .contains(&days_until_expiry)
                    .then_some(ExpiringItem { entry, days_until_expiry })
            })
            .collect()
    }
}

pub fn track_expirations(history: &PurchaseHistory) -> ExpirationModel {
    let mut entries: BTreeMap<String, ShelfLifeEntry> = BTreeMap::new();

    for record in history.records() {
        if entries
            .get(record.name())
            .is_some_and(|existing| existing.purchased_at > record.purchased_at())
        {
            continue;
        }

        let shelf_life_days =
            record.shelf_life_days().unwrap_or_else(|| default_shelf_life_days(record.category()));
        entries.insert(
            record.name().to_owned(),
            ShelfLifeEntry {
                item: record.name().to_owned(),
                category: record.category().to_owned(),
                purchased_at: record.purchased_at(),
                shelf_life_days,
            },
        );
    }

    ExpirationModel { entries }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::track_expirations;
    use crate::domain::purchase::{PurchaseHistory, PurchaseRecord};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn category_default_applies_without_explicit_shelf_life() {
        let history = PurchaseHistory::new(vec![
            PurchaseRecord::new("salmon", "fish", now() - Duration::days(1)).unwrap(),
            PurchaseRecord::new("rice", "dry_goods", now() - Duration::days(1)).unwrap(),
        ]);

        let model = track_expirations(&history);
        let expiring: Vec<&str> =
            model.expiring(now()).iter().map(|item| item.entry.item.as_str()).collect();

        assert_eq!(expiring, vec!["salmon"]);
        assert_eq!(model.entries["rice"].shelf_life_days, 180);
    }

    #[test]
    fn explicit_shelf_life_wins_and_old_purchases_are_ignored() {
        let history = PurchaseHistory::new(vec![
            PurchaseRecord::new("yogurt", "dairy", now() - Duration::days(4))
                .unwrap()
                .with_shelf_life_days(5),
            PurchaseRecord::new("cream", "dairy", now() - Duration::days(20))
                .unwrap()
                .with_shelf_life_days(21),
        ]);

        let model = track_expirations(&history);
        let expiring = model.expiring(now());

        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].entry.item, "yogurt");
        assert_eq!(expiring[0].days_until_expiry, 1);
    }

    #[test]
    fn latest_purchase_replaces_older_one() {
        let history = PurchaseHistory::new(vec![
            PurchaseRecord::new("milk", "dairy", now() - Duration::days(5)).unwrap(),
            PurchaseRecord::new("milk", "dairy", now()).unwrap(),
        ]);

        let model = track_expirations(&history);

        assert_eq!(model.entries["milk"].purchased_at, now());
        assert!(model.expiring(now()).is_empty());
    }
}
