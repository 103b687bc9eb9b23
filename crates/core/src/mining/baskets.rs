use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::purchase::PurchaseHistory;

/// Distinct items bought on one calendar day, in the shopper's own offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Basket {
    pub date: NaiveDate,
    pub items: BTreeSet<String>,
}

/// Group a history into same-day baskets, ordered by date.
pub fn extract_baskets(history: &PurchaseHistory) -> Vec<Basket> {
    let mut by_day: BTreeMap<NaiveDate, BTreeSet<String>> = BTreeMap::new();

    for record in history.records() {
        by_day.entry(record.purchase_day()).or_default().insert(record.name().to_owned());
    }

    by_day.into_iter().map(|(date, items)| Basket { date, items }).collect()
}
