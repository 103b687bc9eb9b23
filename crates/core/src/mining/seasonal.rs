//! Month-of-year purchase preferences.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::domain::purchase::{PurchaseHistory, PurchaseRecord};

/// Shares at or below this are treated as noise and never stored.
pub const SEASONAL_NOISE_FLOOR: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    pub month: u32,
    pub key: String,
    pub preference_score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonalModel {
    /// month (1-12) -> item profiles, highest score first
    pub items: BTreeMap<u32, Vec<SeasonalProfile>>,
    /// month (1-12) -> category profiles, highest score first
    pub categories: BTreeMap<u32, Vec<SeasonalProfile>>,
}

impl SeasonalModel {
    pub fn items_for_month(&self, month: u32) -> &[SeasonalProfile] {
        self.items.get(&month).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn categories_for_month(&self, month: u32) -> &[SeasonalProfile] {
        self.categories.get(&month).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn item_score(&self, month: u32, item: &str) -> Option<f64> {
        self.items_for_month(month)
            .iter()
            .find(|profile| profile.key == item)
            .map(|profile| profile.preference_score)
    }

    pub fn months_with_data(&self) -> usize {
        self.items.len()
    }
}

pub fn learn_seasonal(history: &PurchaseHistory) -> SeasonalModel {
    SeasonalModel {
        items: monthly_shares(history, PurchaseRecord::name),
        categories: monthly_shares(history, PurchaseRecord::category),
    }
}

fn monthly_shares(
    history: &PurchaseHistory,
    key_of: fn(&PurchaseRecord) -> &str,
) -> BTreeMap<u32, Vec<SeasonalProfile>> {
    let mut counts: BTreeMap<u32, BTreeMap<&str, u32>> = BTreeMap::new();
    for record in history.records() {
        *counts.entry(record.purchased_at().month()).or_default().entry(key_of(record)).or_insert(0) +=
            1;
    }

    let mut profiles = BTreeMap::new();
    for (month, keyed) in counts {
        let total: u32 = keyed.values().sum();
        if total == 0 {
            continue;
        }

        let mut month_profiles: Vec<SeasonalProfile> = keyed
            .into_iter()
            .map(|(key, count)| SeasonalProfile {
                month,
                key: key.to_owned(),
                preference_score: (f64::from(count) / f64::from(total)).clamp(0.0, 1.0),
            })
            .filter(|profile| profile.preference_score > SEASONAL_NOISE_FLOOR)
            .collect();

        if month_profiles.is_empty() {
            continue;
        }

        month_profiles.sort_by(|a, b| {
            b.preference_score
                .partial_cmp(&a.preference_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        profiles.insert(month, month_profiles);
    }

    profiles
}
