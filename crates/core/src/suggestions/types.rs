//! Types for the Suggestion Engine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Signal that produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Due for a repurchase
    Pattern,
    /// Usually bought together with a listed item
    Association,
    /// Popular this month
    Seasonal,
    /// A regularly bought category is missing from the list
    CategoryBalance,
    /// Lexically similar to a listed item
    Cluster,
    /// A recent purchase is about to expire
    ExpirationReplacement,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Pattern => "pattern",
            RuleType::Association => "association",
            RuleType::Seasonal => "seasonal",
            RuleType::CategoryBalance => "category_balance",
            RuleType::Cluster => "cluster",
            RuleType::ExpirationReplacement => "expiration_replacement",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked item suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Normalized item name
    pub item: String,
    pub category: String,
    /// Human-readable reasoning
    pub reason: String,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
    pub rule_type: RuleType,
    /// Raw numbers behind the signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<SignalInsights>,
}

/// Signal-specific evidence attached to a suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SignalInsights {
    Repurchase {
        /// `None` for items bought only once
        average_interval_days: Option<f64>,
        days_since_last: i64,
        probability: Option<f64>,
    },
    Association {
        antecedent: String,
        support_count: u32,
        rule_confidence: f64,
        lift: f64,
    },
    Seasonal {
        month: u32,
        preference_score: f64,
    },
    CategoryBalance {
        category_purchases: usize,
        category_share: f64,
    },
    Cluster {
        cluster_id: usize,
        similar_to: String,
    },
    Expiration {
        shelf_life_days: u32,
        days_until_expiry: i64,
    },
}
