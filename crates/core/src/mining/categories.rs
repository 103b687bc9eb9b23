use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::purchase::PurchaseHistory;

/// Per-day decay applied to older purchases when weighting category shares.
const RECENCY_DECAY_PER_DAY: f64 = 0.01;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryPreference {
    pub category: String,
    pub purchase_count: usize,
    /// Recency-weighted share of all purchases as of learning, in [0, 1].
    pub share: f64,
    /// Items in this category, most frequently bought first.
    pub top_items: Vec<(String, usize)>,
    /// Every purchase time in this category, oldest first.
    pub purchase_times: Vec<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryModel {
    pub preferences: BTreeMap<String, CategoryPreference>,
    /// Latest observed category for every item.
    pub item_categories: BTreeMap<String, String>,
}

impl CategoryModel {
    pub fn category_of(&self, item: &str) -> Option<&str> {
        self.item_categories.get(item).map(String::as_str)
    }

    /// Recency-weighted share of `category` re-evaluated as of `now`.
    pub fn share_at(&self, category: &str, now: DateTime<Utc>) -> f64 {
        let Some(preference) = self.preferences.get(category) else {
            return 0.0;
        };

        let total_weight: f64 =
            self.preferences.values().map(|other| recency_weight_sum(&other.purchase_times, now)).sum();
        if total_weight > 0.0 {
            (recency_weight_sum(&preference.purchase_times, now) / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Categories ordered by raw purchase count, ties broken by name.
    pub fn ranked(&self) -> Vec<&CategoryPreference> {
        let mut ranked: Vec<_> = self.preferences.values().collect();
        ranked.sort_by(|a, b| {
            b.purchase_count.cmp(&a.purchase_count).then_with(|| a.category.cmp(&b.category))
        });
        ranked
    }
}

pub fn learn_categories(history: &PurchaseHistory, now: DateTime<Utc>) -> CategoryModel {
    let mut times: BTreeMap<&str, Vec<DateTime<Utc>>> = BTreeMap::new();
    let mut item_counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    let mut latest: BTreeMap<&str, (DateTime<Utc>, &str)> = BTreeMap::new();

    for record in history.records() {
        times.entry(record.category()).or_default().push(record.purchased_at());
        *item_counts.entry(record.category()).or_default().entry(record.name()).or_insert(0) += 1;

        let entry = latest.entry(record.name()).or_insert((record.purchased_at(), record.category()));
        if record.purchased_at() >= entry.0 {
            *entry = (record.purchased_at(), record.category());
        }
    }

    let mut preferences = BTreeMap::new();
    for (category, mut purchase_times) in times {
        purchase_times.sort();

        let mut top_items: Vec<(String, usize)> = item_counts
            .remove(category)
            .unwrap_or_default()
            .into_iter()
            .map(|(item, count)| (item.to_owned(), count))
            .collect();
        top_items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        preferences.insert(
            category.to_owned(),
            CategoryPreference {
                category: category.to_owned(),
                purchase_count: purchase_times.len(),
                share: 0.0,
                top_items,
                purchase_times,
            },
        );
    }

    let item_categories = latest
        .into_iter()
        .map(|(item, (_, category))| (item.to_owned(), category.to_owned()))
        .collect();

    let mut model = CategoryModel { preferences, item_categories };
    let shares: Vec<(String, f64)> =
        model.preferences.keys().map(|category| (category.clone(), model.share_at(category, now))).collect();
    for (category, share) in shares {
        if let Some(preference) = model.preferences.get_mut(&category) {
            preference.share = share;
        }
    }
    model
}

fn recency_weight_sum(purchase_times: &[DateTime<Utc>], now: DateTime<Utc>) -> f64 {
    purchase_times
        .iter()
        .map(|purchased_at| {
            let days_ago = (now - *purchased_at).num_days().max(0) as f64;
            1.0 / (1.0 + days_ago * RECENCY_DECAY_PER_DAY)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::learn_categories;
    use crate::domain::purchase::{PurchaseHistory, PurchaseRecord};

    #[test]
    fn counts_shares_and_top_items_per_category() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let history = PurchaseHistory::new(vec![
            PurchaseRecord::new("milk", "dairy", now).unwrap(),
            PurchaseRecord::new("milk", "dairy", now).unwrap(),
            PurchaseRecord::new("cheese", "dairy", now).unwrap(),
            PurchaseRecord::new("apples", "fruits", now).unwrap(),
        ]);

        let model = learn_categories(&history, now);
        let dairy = &model.preferences["dairy"];

        assert_eq!(dairy.purchase_count, 3);
        assert!((dairy.share - 0.75).abs() < 1e-9);
        assert_eq!(dairy.top_items[0], ("milk".to_string(), 2));
        assert_eq!(model.ranked()[0].category, "dairy");
        assert_eq!(model.category_of("apples"), Some("fruits"));
    }

    #[test]
    fn older_purchases_weigh_less() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let history = PurchaseHistory::new(vec![
            PurchaseRecord::new("milk", "dairy", now - Duration::days(200)).unwrap(),
            PurchaseRecord::new("apples", "fruits", now).unwrap(),
        ]);

        let model = learn_categories(&history, now);

        assert!(model.preferences["fruits"].share > model.preferences["dairy"].share);
        assert_eq!(model.preferences["dairy"].purchase_count, 1);
    }

    #[test]
    fn share_at_matches_a_relearn_at_the_same_instant() {
        let learned_at = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let later = learned_at + Duration::days(400);
        let history = PurchaseHistory::new(vec![
            PurchaseRecord::new("milk", "dairy", learned_at - Duration::days(90)).unwrap(),
            PurchaseRecord::new("milk", "dairy", learned_at - Duration::days(60)).unwrap(),
            PurchaseRecord::new("cheese", "dairy", learned_at - Duration::days(30)).unwrap(),
            PurchaseRecord::new("apples", "fruits", learned_at).unwrap(),
        ]);

        let model = learn_categories(&history, learned_at);
        let relearned = learn_categories(&history, later);

        assert_eq!(model.share_at("dairy", learned_at), model.preferences["dairy"].share);
        assert_eq!(model.share_at("dairy", later), relearned.preferences["dairy"].share);
        assert!(model.share_at("dairy", later) > model.preferences["dairy"].share);
        assert_eq!(model.share_at("spices", later), 0.0);
    }

    #[test]
    fn item_category_tracks_latest_record() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let history = PurchaseHistory::new(vec![
            PurchaseRecord::new("tofu", "protein", now).unwrap(),
            PurchaseRecord::new("tofu", "vegan", now - Duration::days(3)).unwrap(),
        ]);

        assert_eq!(learn_categories(&history, now).category_of("tofu"), Some("protein"));
    }
}
