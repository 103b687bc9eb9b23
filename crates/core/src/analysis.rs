//! Summary statistics over a purchase history.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::purchase::PurchaseHistory;

pub const TOP_CATEGORIES: usize = 3;
pub const TOP_ITEMS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

impl DateRange {
    pub fn span_days(&self) -> i64 {
        (self.last - self.first).num_days()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub total_purchases: usize,
    pub unique_items: usize,
    pub categories_count: usize,
    /// Purchases per week over the history span, one decimal place.
    pub avg_items_per_week: f64,
    /// unique_items / total_purchases; 0 for an empty history.
    pub shopping_diversity: f64,
    pub top_categories: Vec<RankedCount>,
    pub top_items: Vec<RankedCount>,
    pub date_range: Option<DateRange>,
    pub total_spend: Decimal,
}

pub fn analyze_patterns(history: &PurchaseHistory) -> PatternSummary {
    let mut item_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut category_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut categories = BTreeSet::new();
    let mut total_spend = Decimal::ZERO;

    for record in history.records() {
        *item_counts.entry(record.name()).or_insert(0) += 1;
        *category_counts.entry(record.category()).or_insert(0) += 1;
        categories.insert(record.category());
        total_spend += record.line_total();
    }

    let total_purchases = history.len();
    let unique_items = item_counts.len();
    let date_range = history.date_range().map(|(first, last)| DateRange { first, last });

    let avg_items_per_week = match date_range {
        Some(range) => {
            let per_week = total_purchases as f64 / range.span_days().max(1) as f64 * 7.0;
            (per_week * 10.0).round() / 10.0
        }
        None => 0.0,
    };

    PatternSummary {
        total_purchases,
        unique_items,
        categories_count: categories.len(),
        avg_items_per_week,
        shopping_diversity: unique_items as f64 / total_purchases.max(1) as f64,
        top_categories: top_counts(category_counts, TOP_CATEGORIES),
        top_items: top_counts(item_counts, TOP_ITEMS),
        date_range,
        total_spend,
    }
}

fn top_counts(counts: BTreeMap<&str, usize>, limit: usize) -> Vec<RankedCount> {
    let mut ranked: Vec<RankedCount> = counts
        .into_iter()
        .map(|(name, count)| RankedCount { name: name.to_owned(), count })
        .collect();
    // BTreeMap order makes the stable sort break ties by name.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}
