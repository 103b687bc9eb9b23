//! Confidence scaling and final ranking for suggestions

use std::collections::HashSet;

use super::types::*;
use super::{CATEGORY_BALANCE_BASE, CATEGORY_BALANCE_CEILING, CATEGORY_BALANCE_SHARE_WEIGHT};
use crate::domain::purchase::normalize_name;
use crate::domain::shopping_list::ShoppingList;

/// Linear scale with an upper cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceCurve {
    pub factor: f64,
    pub ceiling: f64,
}

impl ConfidenceCurve {
    pub fn apply(&self, raw: f64) -> f64 {
        clamp_unit((raw * self.factor).min(self.ceiling))
    }
}

/// Curves for the signals whose confidence derives from a raw score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceCurves {
    /// Repurchase probability (default: x0.9, max 0.95)
    pub pattern: ConfidenceCurve,
    /// confidence x lift (default: x0.8, max 0.85)
    pub association: ConfidenceCurve,
    /// Monthly preference score (default: x0.8, max 0.7)
    pub seasonal: ConfidenceCurve,
}

impl Default for ConfidenceCurves {
    fn default() -> Self {
        super::DEFAULT_CURVES
    }
}

/// Score calculator for suggestions
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    curves: ConfidenceCurves,
}

impl ScoreCalculator {
    pub fn new() -> Self {
        Self { curves: ConfidenceCurves::default() }
    }

    pub fn pattern_confidence(&self, probability: f64) -> f64 {
        self.curves.pattern.apply(probability)
    }

    pub fn association_confidence(&self, rule_score: f64) -> f64 {
        self.curves.association.apply(rule_score)
    }

    pub fn seasonal_confidence(&self, preference_score: f64) -> f64 {
        self.curves.seasonal.apply(preference_score)
    }

    pub fn category_balance_confidence(&self, category_share: f64) -> f64 {
        clamp_unit(
            (CATEGORY_BALANCE_BASE + category_share * CATEGORY_BALANCE_SHARE_WEIGHT)
                .min(CATEGORY_BALANCE_CEILING),
        )
    }

    /// Dedupe (first wins), drop listed items, sort by confidence and truncate.
    ///
    /// The sort is stable, so equal confidences keep generator order.
    pub fn rank(
        &self,
        candidates: Vec<Suggestion>,
        list: &ShoppingList,
        max_suggestions: usize,
    ) -> Vec<Suggestion> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<Suggestion> = candidates
            .into_iter()
            .filter_map(|mut suggestion| {
                suggestion.item = normalize_name(&suggestion.item);
                if suggestion.item.is_empty() || !seen.insert(suggestion.item.clone()) {
                    return None;
                }
                if list.contains(&suggestion.item) {
                    return None;
                }
                suggestion.confidence = clamp_unit(suggestion.confidence);
                Some(suggestion)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(max_suggestions);
        ranked
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
