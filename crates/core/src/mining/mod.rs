//! Pattern mining over a purchase history snapshot.
//!
//! Every learner is a pure function of the history (and `now` where recency
//! matters). [`learn`] runs all of them and bundles the results into an
//! immutable [`LearnedModel`] that the suggestion engine reads from.

pub mod associations;
pub mod baskets;
pub mod categories;
pub mod clustering;
pub mod expiration;
pub mod repurchase;
pub mod seasonal;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::HistoryFingerprint;
use crate::config::EngineConfig;
use crate::domain::purchase::PurchaseHistory;

pub use associations::{mine_associations, AssociationModel, AssociationRule};
pub use baskets::{extract_baskets, Basket};
pub use categories::{learn_categories, CategoryModel, CategoryPreference};
pub use clustering::{cluster_items, ClusterModel, ItemCluster};
pub use expiration::{track_expirations, ExpirationModel, ShelfLifeEntry};
pub use repurchase::{predict_repurchases, RepurchaseModel, RepurchasePattern, SinglePurchase};
pub use seasonal::{learn_seasonal, SeasonalModel, SeasonalProfile};

pub const TOP_ASSOCIATIONS_IN_INSIGHTS: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnedModel {
    pub learned_at: DateTime<Utc>,
    pub fingerprint: HistoryFingerprint,
    pub total_purchases: usize,
    /// Purchase records per item, used to rank alternatives.
    pub purchase_counts: BTreeMap<String, usize>,
    pub associations: AssociationModel,
    pub repurchase: RepurchaseModel,
    pub seasonal: SeasonalModel,
    pub categories: CategoryModel,
    pub clusters: ClusterModel,
    pub expirations: ExpirationModel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInsights {
    pub learned_associations: usize,
    pub seasonal_months: usize,
    pub tracked_items: usize,
    pub item_clusters: usize,
    pub category_preferences: usize,
    pub top_associations: Vec<AssociationRule>,
}

impl LearnedModel {
    pub fn purchase_count(&self, item: &str) -> usize {
        self.purchase_counts.get(item).copied().unwrap_or(0)
    }

    pub fn insights(&self) -> ModelInsights {
        let mut top_associations: Vec<AssociationRule> =
            self.associations.rules.values().flatten().cloned().collect();
        top_associations.sort_by(|a, b| {
            (b.confidence * b.lift)
                .partial_cmp(&(a.confidence * a.lift))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.antecedent.cmp(&b.antecedent))
                .then_with(|| a.consequent.cmp(&b.consequent))
        });
        top_associations.truncate(TOP_ASSOCIATIONS_IN_INSIGHTS);

        ModelInsights {
            learned_associations: self.associations.rule_count(),
            seasonal_months: self.seasonal.months_with_data(),
            tracked_items: self.repurchase.tracked_items(),
            item_clusters: self.clusters.len(),
            category_preferences: self.categories.preferences.len(),
            top_associations,
        }
    }
}

/// Run every learner over `history`.
pub fn learn(history: &PurchaseHistory, config: &EngineConfig, now: DateTime<Utc>) -> LearnedModel {
    learn_with_fingerprint(history, config, now, HistoryFingerprint::compute(history, config))
}

pub(crate) fn learn_with_fingerprint(
    history: &PurchaseHistory,
    config: &EngineConfig,
    now: DateTime<Utc>,
    fingerprint: HistoryFingerprint,
) -> LearnedModel {
    let baskets = extract_baskets(history);
    let associations = mine_associations(&baskets, config.min_support, config.min_confidence);
    let repurchase = predict_repurchases(history, now, config.single_purchase_suggest_days);
    let seasonal = learn_seasonal(history);
    let categories = learn_categories(history, now);
    let clusters =
        cluster_items(history.distinct_items(), config.cluster_seed).unwrap_or_default();
    let expirations = track_expirations(history);

    let mut purchase_counts = BTreeMap::new();
    for record in history.records() {
        *purchase_counts.entry(record.name().to_owned()).or_insert(0) += 1;
    }

    info!(
        event_name = "core.mining.learned",
        purchases = history.len(),
        baskets = baskets.len(),
        rules = associations.rule_count(),
        clusters = clusters.len(),
        fingerprint = %fingerprint,
        "learned purchase patterns"
    );

    LearnedModel {
        learned_at: now,
        fingerprint,
        total_purchases: history.len(),
        purchase_counts,
        associations,
        repurchase,
        seasonal,
        categories,
        clusters,
        expirations,
    }
}
