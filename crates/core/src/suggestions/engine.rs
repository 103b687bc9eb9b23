//! Suggestion Engine implementation

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;

use super::scoring::ScoreCalculator;
use super::types::*;
use super::{
    CLUSTER_CONFIDENCE, EXPIRATION_CONFIDENCE, MAX_CLUSTER_MATES, MIN_ASSOCIATION_SCORE,
    SINGLE_PURCHASE_CONFIDENCE,
};
use crate::config::EngineConfig;
use crate::domain::category::guess_category;
use crate::domain::purchase::PurchaseHistory;
use crate::domain::shopping_list::ShoppingList;
use crate::mining::{self, LearnedModel};

/// Category for an item: learned from history, else guessed from its name.
fn item_category(model: &LearnedModel, item: &str) -> String {
    model.categories.category_of(item).unwrap_or_else(|| guess_category(item)).to_owned()
}

/// Category for a listed item: pinned on the list, else learned, else guessed.
fn listed_category(model: &LearnedModel, list: &ShoppingList, item: &str) -> String {
    match list.explicit_category(item) {
        Some(category) => category.to_owned(),
        None => item_category(model, item),
    }
}

/// The main suggestion engine
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    config: EngineConfig,
    /// Confidence scaling and ranking
    calculator: ScoreCalculator,
}

impl SuggestionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, calculator: ScoreCalculator::new() }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Learn every pattern from `history` as of `now`.
    pub fn learn(&self, history: &PurchaseHistory, now: DateTime<Utc>) -> LearnedModel {
        mining::learn(history, &self.config, now)
    }

    /// Rank suggestions for `list` from an already learned model.
    pub fn suggest(&self, model: &LearnedModel, list: &ShoppingList, now: DateTime<Utc>) -> Vec<Suggestion> {
        let mut candidates = self.pattern_suggestions(model, now);
        candidates.extend(self.association_suggestions(model, list));
        candidates.extend(self.seasonal_suggestions(model, now));
        candidates.extend(self.category_balance_suggestions(model, list, now));
        candidates.extend(self.cluster_suggestions(model, list));
        candidates.extend(self.expiration_suggestions(model, now));

        let generated = candidates.len();
        let ranked = self.calculator.rank(candidates, list, self.config.max_suggestions);

        debug!(
            event_name = "core.suggestions.ranked",
            list_items = list.len(),
            candidates = generated,
            returned = ranked.len(),
            "ranked suggestions"
        );

        ranked
    }

    /// Learn and suggest in one pass, as of now.
    pub fn generate_suggestions(&self, list: &ShoppingList, history: &PurchaseHistory) -> Vec<Suggestion> {
        self.generate_suggestions_at(list, history, Utc::now())
    }

    pub fn generate_suggestions_at(
        &self,
        list: &ShoppingList,
        history: &PurchaseHistory,
        now: DateTime<Utc>,
    ) -> Vec<Suggestion> {
        if history.is_empty() {
            return Vec::new();
        }

        let model = self.learn(history, now);
        self.suggest(&model, list, now)
    }

    fn pattern_suggestions(&self, model: &LearnedModel, now: DateTime<Utc>) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        for pattern in model.repurchase.patterns.values() {
            let probability = pattern.probability_at(now);
            if probability <= self.config.pattern_probability_threshold {
                continue;
            }

            let days_since_last = (now - pattern.last_purchase).num_days();
            suggestions.push(Suggestion {
                item: pattern.item.clone(),
                category: item_category(model, &pattern.item),
                reason: format!(
                    "You usually buy this every {:.0} days; last bought {} days ago",
                    pattern.average_interval_days, days_since_last
                ),
                confidence: self.calculator.pattern_confidence(probability),
                rule_type: RuleType::Pattern,
                insights: Some(SignalInsights::Repurchase {
                    average_interval_days: Some(pattern.average_interval_days),
                    days_since_last,
                    probability: Some(probability),
                }),
            });
        }

        for single in model.repurchase.single_purchases.values() {
            let days_since_last = (now - single.last_purchase).num_days();
            if days_since_last < self.config.single_purchase_suggest_days {
                continue;
            }

            suggestions.push(Suggestion {
                item: single.item.clone(),
                category: item_category(model, &single.item),
                reason: format!("Bought once, {days_since_last} days ago"),
                confidence: SINGLE_PURCHASE_CONFIDENCE,
                rule_type: RuleType::Pattern,
                insights: Some(SignalInsights::Repurchase {
                    average_interval_days: None,
                    days_since_last,
                    probability: None,
                }),
            });
        }

        suggestions
    }

    fn association_suggestions(&self, model: &LearnedModel, list: &ShoppingList) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        for antecedent in list.names() {
            for rule in model.associations.rules_from(antecedent) {
                let rule_score = rule.confidence * rule.lift;
                if rule_score <= MIN_ASSOCIATION_SCORE {
                    continue;
                }

                suggestions.push(Suggestion {
                    item: rule.consequent.clone(),
                    category: item_category(model, &rule.consequent),
                    reason: format!(
                        "Bought with {antecedent} {:.0}% of the time",
                        rule.confidence * 100.0
                    ),
                    confidence: self.calculator.association_confidence(rule_score),
                    rule_type: RuleType::Association,
                    insights: Some(SignalInsights::Association {
                        antecedent: antecedent.to_owned(),
                        support_count: rule.support_count,
                        rule_confidence: rule.confidence,
                        lift: rule.lift,
                    }),
                });
            }
        }

        suggestions
    }

    fn seasonal_suggestions(&self, model: &LearnedModel, now: DateTime<Utc>) -> Vec<Suggestion> {
        let month = now.month();
        let month_name = now.format("%B").to_string();

        model
            .seasonal
            .items_for_month(month)
            .iter()
            .filter(|profile| profile.preference_score > self.config.seasonal_threshold)
            .map(|profile| Suggestion {
                item: profile.key.clone(),
                category: item_category(model, &profile.key),
                reason: format!("You often buy this in {month_name}"),
                confidence: self.calculator.seasonal_confidence(profile.preference_score),
                rule_type: RuleType::Seasonal,
                insights: Some(SignalInsights::Seasonal {
                    month,
                    preference_score: profile.preference_score,
                }),
            })
            .collect()
    }

    fn category_balance_suggestions(
        &self,
        model: &LearnedModel,
        list: &ShoppingList,
        now: DateTime<Utc>,
    ) -> Vec<Suggestion> {
        let listed: BTreeSet<String> =
            list.names().map(|item| listed_category(model, list, item)).collect();
        let mut suggestions = Vec::new();

        for preference in model.categories.ranked() {
            if preference.purchase_count <= self.config.category_min_purchases
                || listed.contains(&preference.category)
            {
                continue;
            }

            let Some((item, _)) = preference.top_items.iter().find(|(item, _)| !list.contains(item))
            else {
                continue;
            };

            let share = model.categories.share_at(&preference.category, now);
            suggestions.push(Suggestion {
                item: item.clone(),
                category: preference.category.clone(),
                reason: format!(
                    "Nothing from {} on your list yet; you buy it regularly",
                    preference.category
                ),
                confidence: self.calculator.category_balance_confidence(share),
                rule_type: RuleType::CategoryBalance,
                insights: Some(SignalInsights::CategoryBalance {
                    category_purchases: preference.purchase_count,
                    category_share: share,
                }),
            });
        }

        suggestions
    }

    fn cluster_suggestions(&self, model: &LearnedModel, list: &ShoppingList) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        for anchor in list.names() {
            let Some(cluster) = model.clusters.cluster_of(anchor) else {
                continue;
            };

            let mut mates: Vec<&String> = cluster
                .members
                .iter()
                .filter(|member| member.as_str() != anchor && !list.contains(member))
                .collect();
            mates.sort_by(|a, b| {
                model.purchase_count(b).cmp(&model.purchase_count(a)).then_with(|| a.cmp(b))
            });

            for mate in mates.into_iter().take(MAX_CLUSTER_MATES) {
                suggestions.push(Suggestion {
                    item: mate.clone(),
                    category: item_category(model, mate),
                    reason: format!("Similar to {anchor} on your list"),
                    confidence: CLUSTER_CONFIDENCE,
                    rule_type: RuleType::Cluster,
                    insights: Some(SignalInsights::Cluster {
                        cluster_id: cluster.cluster_id,
                        similar_to: anchor.to_owned(),
                    }),
                });
            }
        }

        suggestions
    }

    fn expiration_suggestions(&self, model: &LearnedModel, now: DateTime<Utc>) -> Vec<Suggestion> {
        model
            .expirations
            .expiring(now)
            .into_iter()
            .map(|expiring| {
                let reason = match expiring.days_until_expiry {
                    0 => "Your last one expires today".to_owned(),
                    1 => "Your last one expires tomorrow".to_owned(),
                    days => format!("Your last one expires in {days} days"),
                };

                Suggestion {
                    item: expiring.entry.item.clone(),
                    category: expiring.entry.category.clone(),
                    reason,
                    confidence: EXPIRATION_CONFIDENCE,
                    rule_type: RuleType::ExpirationReplacement,
                    insights: Some(SignalInsights::Expiration {
                        shelf_life_days: expiring.entry.shelf_life_days,
                        days_until_expiry: expiring.days_until_expiry,
                    }),
                }
            })
            .collect()
    }
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::domain::purchase::PurchaseRecord;
    use crate::mining::{ClusterModel, ItemCluster};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn record(name: &str, category: &str, when: DateTime<Utc>) -> PurchaseRecord {
        PurchaseRecord::new(name, category, when).unwrap()
    }

    fn milk_bread_history() -> PurchaseHistory {
        let mut records = Vec::new();
        for day in 1..=3 {
            records.push(record("milk", "dairy", at(2024, 5, day)));
            records.push(record("bread", "grains", at(2024, 5, day)));
        }
        records.push(record("milk", "dairy", at(2024, 5, 4)));
        records.push(record("milk", "dairy", at(2024, 5, 5)));
        records.push(record("bread", "grains", at(2024, 5, 6)));
        records.push(record("eggs", "protein", at(2024, 5, 7)));
        records.push(record("eggs", "protein", at(2024, 5, 8)));
        records.push(record("apples", "fruits", at(2024, 5, 9)));
        records.push(record("apples", "fruits", at(2024, 5, 10)));
        PurchaseHistory::new(records)
    }

    fn weekly_household() -> PurchaseHistory {
        let start = at(2024, 1, 6);
        let mut records = Vec::new();
        for week in 0..12 {
            let day = start + Duration::days(week * 7);
            records.push(record("whole milk", "dairy", day));
            records.push(record("sourdough bread", "grains", day));
            if week % 2 == 0 {
                records.push(record("oat milk", "dairy", day));
                records.push(record("bananas", "fruits", day));
            }
            if week % 3 == 0 {
                records.push(record("cheddar cheese", "dairy", day));
                records.push(record("salmon", "fish", day));
            }
        }
        records.push(record("saffron", "condiments", at(2024, 1, 20)));
        PurchaseHistory::new(records)
    }

    #[test]
    fn empty_history_yields_no_suggestions() {
        let engine = SuggestionEngine::default();
        let list = ShoppingList::from_names(["milk"]);

        assert!(engine.generate_suggestions(&list, &PurchaseHistory::default()).is_empty());
        assert!(engine
            .generate_suggestions_at(&list, &PurchaseHistory::default(), at(2024, 1, 1))
            .is_empty());
    }

    #[test]
    fn single_purchase_resurfaces_after_fourteen_days() {
        let engine = SuggestionEngine::default();
        let list = ShoppingList::new();

        let old = PurchaseHistory::new(vec![record("saffron", "spices", at(2024, 2, 20))]);
        let suggestions = engine.generate_suggestions_at(&list, &old, at(2024, 3, 6));
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].item, "saffron");
        assert_eq!(suggestions[0].rule_type, RuleType::Pattern);
        assert!((suggestions[0].confidence - SINGLE_PURCHASE_CONFIDENCE).abs() < 1e-9);

        let recent = PurchaseHistory::new(vec![record("saffron", "spices", at(2024, 2, 25))]);
        assert!(engine.generate_suggestions_at(&list, &recent, at(2024, 3, 6)).is_empty());
    }

    #[test]
    fn due_repurchase_scales_probability() {
        let engine = SuggestionEngine::default();
        let history = PurchaseHistory::new(vec![
            record("x", "misc", at(2024, 1, 1)),
            record("x", "misc", at(2024, 1, 11)),
            record("x", "misc", at(2024, 1, 21)),
        ]);

        let suggestions = engine.generate_suggestions_at(&ShoppingList::new(), &history, at(2024, 1, 29));

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].rule_type, RuleType::Pattern);
        assert!((suggestions[0].confidence - 0.72).abs() < 1e-9);
        match &suggestions[0].insights {
            Some(SignalInsights::Repurchase { days_since_last, probability, .. }) => {
                assert_eq!(*days_since_last, 8);
                assert!((probability.unwrap_or_default() - 0.8).abs() < 1e-9);
            }
            other => panic!("unexpected insights: {other:?}"),
        }
    }

    #[test]
    fn association_proposes_strong_consequents() {
        let engine = SuggestionEngine::default();
        let model = engine.learn(&milk_bread_history(), at(2024, 5, 10));

        let suggestions = engine.association_suggestions(&model, &ShoppingList::from_names(["milk"]));
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].item, "bread");
        assert_eq!(suggestions[0].category, "grains");
        assert!((suggestions[0].confidence - 0.72).abs() < 1e-9);

        assert!(engine.association_suggestions(&model, &ShoppingList::from_names(["eggs"])).is_empty());
    }

    #[test]
    fn seasonal_uses_the_current_month() {
        let history = PurchaseHistory::new(vec![
            record("pumpkin", "vegetables", at(2023, 10, 1)),
            record("pumpkin", "vegetables", at(2023, 10, 8)),
            record("pumpkin", "vegetables", at(2023, 10, 15)),
            record("milk", "dairy", at(2023, 10, 15)),
        ]);
        let engine = SuggestionEngine::default();
        let model = engine.learn(&history, at(2024, 10, 5));

        let suggestions = engine.seasonal_suggestions(&model, at(2024, 10, 5));
        assert_eq!(suggestions[0].item, "pumpkin");
        assert!((suggestions[0].confidence - 0.6).abs() < 1e-9);
        assert!(suggestions.iter().any(|s| s.item == "milk" && (s.confidence - 0.2).abs() < 1e-9));

        let strict = SuggestionEngine::new(EngineConfig { seasonal_threshold: 0.3, ..EngineConfig::default() });
        let only_pumpkin = strict.seasonal_suggestions(&model, at(2024, 10, 5));
        assert_eq!(only_pumpkin.len(), 1);

        assert!(engine.seasonal_suggestions(&model, at(2024, 4, 5)).is_empty());
    }

    #[test]
    fn category_balance_fills_missing_regular_categories() {
        let now = at(2024, 6, 30);
        let history = PurchaseHistory::new(vec![
            record("milk", "dairy", now - Duration::days(3)),
            record("milk", "dairy", now - Duration::days(10)),
            record("milk", "dairy", now - Duration::days(17)),
            record("cheese", "dairy", now - Duration::days(5)),
            record("cheese", "dairy", now - Duration::days(12)),
            record("apples", "fruits", now - Duration::days(4)),
        ]);
        let engine = SuggestionEngine::default();
        let model = engine.learn(&history, now);

        let apples = ShoppingList::from_names(["apples"]);
        let suggestions = engine.category_balance_suggestions(&model, &apples, now);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].item, "milk");
        assert_eq!(suggestions[0].rule_type, RuleType::CategoryBalance);
        assert!(suggestions[0].confidence >= 0.3 && suggestions[0].confidence <= 0.6);

        let with_milk = ShoppingList::from_names(["apples", "milk"]);
        let suggestions = engine.category_balance_suggestions(&model, &with_milk, now);
        assert!(suggestions.is_empty(), "milk already covers dairy");

        let with_yogurt = ShoppingList::from_names(["yogurt"]);
        assert!(engine.category_balance_suggestions(&model, &with_yogurt, now).is_empty());
    }

    #[test]
    fn cluster_mates_ranked_by_purchase_count() {
        let now = at(2024, 6, 30);
        let history = PurchaseHistory::new(vec![
            record("oat milk", "dairy", now - Duration::days(30)),
            record("oat milk", "dairy", now - Duration::days(20)),
            record("oat milk", "dairy", now - Duration::days(10)),
            record("almond milk", "dairy", now - Duration::days(25)),
            record("almond milk", "dairy", now - Duration::days(15)),
            record("skim milk", "dairy", now - Duration::days(40)),
            record("whole milk", "dairy", now - Duration::days(35)),
        ]);
        let engine = SuggestionEngine::default();
        let mut model = engine.learn(&history, now);
        model.clusters = ClusterModel::from_clusters(vec![ItemCluster {
            cluster_id: 0,
            members: vec![
                "almond milk".to_string(),
                "oat milk".to_string(),
                "skim milk".to_string(),
                "whole milk".to_string(),
            ],
        }]);

        let suggestions = engine.cluster_suggestions(&model, &ShoppingList::from_names(["whole milk"]));
        let items: Vec<&str> = suggestions.iter().map(|s| s.item.as_str()).collect();

        assert_eq!(items, vec!["oat milk", "almond milk"]);
        assert!(suggestions.iter().all(|s| (s.confidence - CLUSTER_CONFIDENCE).abs() < 1e-9));
    }

    #[test]
    fn expiring_recent_purchase_is_replaced() {
        let now = at(2024, 8, 20);
        let history = PurchaseHistory::new(vec![record("salmon", "fish", now - Duration::days(1))]);
        let engine = SuggestionEngine::default();
        let model = engine.learn(&history, now);

        let suggestions = engine.expiration_suggestions(&model, now);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].rule_type, RuleType::ExpirationReplacement);
        assert_eq!(suggestions[0].reason, "Your last one expires tomorrow");
        assert!((suggestions[0].confidence - EXPIRATION_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn ranked_output_is_bounded_unique_sorted_and_excludes_list() {
        let engine = SuggestionEngine::default();
        let list = ShoppingList::from_names(["whole milk", "Bananas"]);

        let suggestions = engine.generate_suggestions_at(&list, &weekly_household(), at(2024, 4, 10));

        assert!(!suggestions.is_empty());
        assert!(suggestions.len() <= engine.config().max_suggestions);

        let mut seen = HashSet::new();
        for suggestion in &suggestions {
            assert!((0.0..=1.0).contains(&suggestion.confidence));
            assert!(seen.insert(suggestion.item.clone()), "duplicate {}", suggestion.item);
            assert!(!list.contains(&suggestion.item));
        }
        assert!(suggestions.windows(2).all(|pair| pair[0].confidence >= pair[1].confidence));
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let engine = SuggestionEngine::default();
        let list = ShoppingList::from_names(["sourdough bread"]);
        let history = weekly_household();
        let now = at(2024, 4, 10);

        let first = engine.generate_suggestions_at(&list, &history, now);
        let second = engine.generate_suggestions_at(&list, &history, now);
        assert_eq!(first, second);

        let model = engine.learn(&history, now);
        assert_eq!(engine.suggest(&model, &list, now), first);
    }

    #[test]
    fn max_suggestions_truncates() {
        let engine = SuggestionEngine::new(EngineConfig { max_suggestions: 2, ..EngineConfig::default() });

        let suggestions =
            engine.generate_suggestions_at(&ShoppingList::new(), &weekly_household(), at(2024, 4, 10));

        assert_eq!(suggestions.len(), 2);
    }
}
