//! Per-item purchase cadence and next-purchase likelihood.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::purchase::PurchaseHistory;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepurchasePattern {
    pub item: String,
    pub average_interval_days: f64,
    /// Population standard deviation of the gaps.
    pub stddev_interval_days: f64,
    pub last_purchase: DateTime<Utc>,
    pub purchase_count: usize,
    pub days_since_last: i64,
    pub next_purchase_probability: f64,
}

impl RepurchasePattern {
    /// Elapsed fraction of the average interval as of `now`, clamped to [0, 1].
    pub fn probability_at(&self, now: DateTime<Utc>) -> f64 {
        repurchase_probability((now - self.last_purchase).num_days(), self.average_interval_days)
    }
}

/// An item bought exactly once. It has no cadence, only an age.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SinglePurchase {
    pub item: String,
    pub last_purchase: DateTime<Utc>,
    pub days_since_last: i64,
    pub suggest: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepurchaseModel {
    pub patterns: BTreeMap<String, RepurchasePattern>,
    pub single_purchases: BTreeMap<String, SinglePurchase>,
}

impl RepurchaseModel {
    pub fn pattern(&self, item: &str) -> Option<&RepurchasePattern> {
        self.patterns.get(item)
    }

    pub fn tracked_items(&self) -> usize {
        self.patterns.len() + self.single_purchases.len()
    }
}

pub fn predict_repurchases(
    history: &PurchaseHistory,
    now: DateTime<Utc>,
    single_purchase_suggest_days: i64,
) -> RepurchaseModel {
    let mut purchase_times: BTreeMap<&str, Vec<DateTime<Utc>>> = BTreeMap::new();
    for record in history.records() {
        purchase_times.entry(record.name()).or_default().push(record.purchased_at());
    }

    let mut model = RepurchaseModel::default();

    for (item, mut times) in purchase_times {
        times.sort();
        let Some(&last_purchase) = times.last() else {
            continue;
        };
        let days_since_last = (now - last_purchase).num_days();

        if times.len() == 1 {
            model.single_purchases.insert(
                item.to_owned(),
                SinglePurchase {
                    item: item.to_owned(),
                    last_purchase,
                    days_since_last,
                    suggest: days_since_last >= single_purchase_suggest_days,
                },
            );
            continue;
        }

        let gaps: Vec<f64> =
            times.windows(2).map(|pair| (pair[1] - pair[0]).num_days() as f64).collect();
        let (average, stddev) = mean_and_population_stddev(&gaps);

        let probability = repurchase_probability(days_since_last, average);

        model.patterns.insert(
            item.to_owned(),
            RepurchasePattern {
                item: item.to_owned(),
                average_interval_days: average,
                stddev_interval_days: stddev,
                last_purchase,
                purchase_count: times.len(),
                days_since_last,
                next_purchase_probability: probability,
            },
        );
    }

    model
}

fn repurchase_probability(days_since_last: i64, average_interval_days: f64) -> f64 {
    if average_interval_days > 0.0 {
        (days_since_last as f64 / average_interval_days).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn mean_and_population_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    if values.len() == 1 {
        return (mean, 0.0);
    }

    let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / count;
    (mean, variance.sqrt())
}
