//! Market-basket association mining over daily baskets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::baskets::Basket;

/// Directional rule `antecedent -> consequent`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: String,
    pub consequent: String,
    /// Baskets containing both items.
    pub support_count: u32,
    /// P(consequent | antecedent), always within [0, 1].
    pub confidence: f64,
    /// Confidence over the consequent's base rate. Unbounded above.
    pub lift: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociationModel {
    pub total_baskets: usize,
    pub item_counts: BTreeMap<String, u32>,
    /// Rules grouped by antecedent, strongest first.
    pub rules: BTreeMap<String, Vec<AssociationRule>>,
}

impl AssociationModel {
    pub fn rules_from(&self, antecedent: &str) -> &[AssociationRule] {
        self.rules.get(antecedent).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn rule(&self, antecedent: &str, consequent: &str) -> Option<&AssociationRule> {
        self.rules_from(antecedent).iter().find(|rule| rule.consequent == consequent)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Count pairwise co-occurrences and keep rules that clear both thresholds.
///
/// A rule `A -> B` survives when `A` appears in at least `min_support`
/// baskets, the pair co-occurs in at least `min_support` baskets, and the
/// confidence is strictly greater than `min_confidence`.
pub fn mine_associations(baskets: &[Basket], min_support: u32, min_confidence: f64) -> AssociationModel {
    let mut item_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut co_occurrence: BTreeMap<(String, String), u32> = BTreeMap::new();

    for basket in baskets {
        let items: Vec<&String> = basket.items.iter().collect();
        for item in &items {
            *item_counts.entry((*item).clone()).or_insert(0) += 1;
        }

        for (index, first) in items.iter().enumerate() {
            for second in &items[index + 1..] {
                *co_occurrence.entry(((*first).clone(), (*second).clone())).or_insert(0) += 1;
                *co_occurrence.entry(((*second).clone(), (*first).clone())).or_insert(0) += 1;
            }
        }
    }

    let total_baskets = baskets.len();
    let mut rules: BTreeMap<String, Vec<AssociationRule>> = BTreeMap::new();

    for ((antecedent, consequent), support_count) in co_occurrence {
        let antecedent_count = item_counts.get(&antecedent).copied().unwrap_or(0);
        if antecedent_count < min_support || support_count < min_support {
            continue;
        }

        let confidence = ratio(support_count as f64, antecedent_count as f64).clamp(0.0, 1.0);
        if confidence <= min_confidence {
            continue;
        }

        let consequent_count = item_counts.get(&consequent).copied().unwrap_or(0);
        let base_rate = ratio(consequent_count as f64, total_baskets as f64);
        let lift = ratio(confidence, base_rate);

        rules.entry(antecedent.clone()).or_default().push(AssociationRule {
            antecedent,
            consequent,
            support_count,
            confidence,
            lift,
        });
    }

    for list in rules.values_mut() {
        list.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.support_count.cmp(&a.support_count))
                .then_with(|| a.consequent.cmp(&b.consequent))
        });
    }

    AssociationModel { total_baskets, item_counts, rules }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
