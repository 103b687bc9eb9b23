//! Shopping suggestions
//!
//! Turns a [`LearnedModel`](crate::mining::LearnedModel) and the current
//! shopping list into a ranked list of items the shopper is likely to need,
//! drawing on repurchase cadence, co-purchase rules, seasonality, category
//! balance, lexical clusters and shelf life.

mod engine;
mod scoring;
mod types;

pub use engine::SuggestionEngine;
pub use scoring::{ConfidenceCurve, ConfidenceCurves, ScoreCalculator};
pub use types::*;

/// Default confidence curves, one per scored signal
pub const DEFAULT_CURVES: ConfidenceCurves = ConfidenceCurves {
    pattern: ConfidenceCurve { factor: 0.9, ceiling: 0.95 },
    association: ConfidenceCurve { factor: 0.8, ceiling: 0.85 },
    seasonal: ConfidenceCurve { factor: 0.8, ceiling: 0.7 },
};

/// Maximum suggestions to return
pub const DEFAULT_MAX_SUGGESTIONS: usize = 15;

/// confidence x lift an association must exceed before it is proposed
pub const MIN_ASSOCIATION_SCORE: f64 = 0.4;

/// Fixed confidence for items bought once and not since
pub const SINGLE_PURCHASE_CONFIDENCE: f64 = 0.6;

pub const CLUSTER_CONFIDENCE: f64 = 0.5;

/// Cluster mates proposed per listed item
pub const MAX_CLUSTER_MATES: usize = 2;

pub const EXPIRATION_CONFIDENCE: f64 = 0.7;

/// Category balance confidence is `base + share * weight`, capped.
pub const CATEGORY_BALANCE_BASE: f64 = 0.3;
pub const CATEGORY_BALANCE_SHARE_WEIGHT: f64 = 0.5;
pub const CATEGORY_BALANCE_CEILING: f64 = 0.6;
