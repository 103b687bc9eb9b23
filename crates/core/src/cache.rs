//! Memoised learning keyed by a content fingerprint of the history snapshot.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::purchase::PurchaseHistory;
use crate::mining::{self, LearnedModel};

pub const DEFAULT_CACHE_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryFingerprint(String);

impl HistoryFingerprint {
    /// Hash every record field plus the engine settings that shape learning.
    pub fn compute(history: &PurchaseHistory, config: &EngineConfig) -> Self {
        let mut hasher = blake3::Hasher::new();

        hasher.update(&(history.len() as u64).to_le_bytes());
        for record in history.records() {
            hash_str(&mut hasher, record.name());
            hash_str(&mut hasher, record.category());
            hasher.update(&record.quantity().to_le_bytes());
            hash_str(&mut hasher, record.unit());
            hasher.update(&record.purchased_at().timestamp_millis().to_le_bytes());
            hash_str(&mut hasher, &record.purchase_day().to_string());
            hash_str(&mut hasher, &record.unit_price().normalize().to_string());
            hasher.update(&[u8::from(record.is_organic())]);
            hasher.update(&record.shelf_life_days().map_or(u64::MAX, u64::from).to_le_bytes());
        }

        hasher.update(&config.min_support.to_le_bytes());
        hasher.update(&config.min_confidence.to_bits().to_le_bytes());
        hasher.update(&config.cluster_seed.to_le_bytes());
        hasher.update(&config.single_purchase_suggest_days.to_le_bytes());

        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hash_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Thread-safe memo of learned models.
///
/// A model is reused only while the history and the learning-relevant config
/// are unchanged; any new purchase changes the fingerprint and forces a relearn.
/// The key ignores `now`: the engine re-evaluates every recency-dependent
/// signal against its own `now`, so a reused model ranks like a fresh one.
/// Snapshot fields such as `days_since_last` stay as of the first learn.
#[derive(Debug)]
pub struct ModelCache {
    capacity: usize,
    entries: Mutex<HashMap<HistoryFingerprint, Arc<LearnedModel>>>,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ModelCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: Mutex::new(HashMap::new()) }
    }

    pub fn get_or_learn(&self, history: &PurchaseHistory, config: &EngineConfig) -> Arc<LearnedModel> {
        self.get_or_learn_at(history, config, Utc::now())
    }

    pub fn get_or_learn_at(
        &self,
        history: &PurchaseHistory,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Arc<LearnedModel> {
        let fingerprint = HistoryFingerprint::compute(history, config);

        if let Some(model) = self.entries().get(&fingerprint) {
            debug!(event_name = "core.cache.hit", fingerprint = %fingerprint, "reusing learned model");
            return Arc::clone(model);
        }

        // Learn without holding the lock; clustering can be slow.
        let learned = Arc::new(mining::learn_with_fingerprint(history, config, now, fingerprint.clone()));

        let mut entries = self.entries();
        if let Some(model) = entries.get(&fingerprint) {
            debug!(event_name = "core.cache.hit", fingerprint = %fingerprint, "model learned concurrently");
            return Arc::clone(model);
        }

        if entries.len() >= self.capacity {
            entries.clear();
        }

        entries.insert(fingerprint.clone(), Arc::clone(&learned));
        debug!(event_name = "core.cache.miss", fingerprint = %fingerprint, "learned new model");
        learned
    }

    pub fn invalidate(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<HistoryFingerprint, Arc<LearnedModel>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{Duration, TimeZone, Utc};

    use super::{HistoryFingerprint, ModelCache};
    use crate::config::EngineConfig;
    use crate::domain::purchase::{PurchaseHistory, PurchaseRecord};
    use crate::domain::shopping_list::ShoppingList;
    use crate::suggestions::{RuleType, SuggestionEngine};

    fn history(extra: usize) -> PurchaseHistory {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        (0..3 + extra)
            .map(|day| PurchaseRecord::new("milk", "dairy", start + Duration::days(day as i64)).unwrap())
            .collect()
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let config = EngineConfig::default();

        let first = HistoryFingerprint::compute(&history(0), &config);
        assert_eq!(first, HistoryFingerprint::compute(&history(0), &config));
        assert_eq!(first.as_str().len(), 64);
        assert_ne!(first, HistoryFingerprint::compute(&history(1), &config));

        let tuned = EngineConfig { min_support: 3, ..EngineConfig::default() };
        assert_ne!(first, HistoryFingerprint::compute(&history(0), &tuned));
    }

    #[test]
    fn unchanged_history_reuses_the_model() {
        let cache = ModelCache::default();
        let config = EngineConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let first = cache.get_or_learn_at(&history(0), &config, now);
        let second = cache.get_or_learn_at(&history(0), &config, now + Duration::days(1));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn new_purchase_invalidates_by_fingerprint() {
        let cache = ModelCache::default();
        let config = EngineConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let before = cache.get_or_learn_at(&history(0), &config, now);
        let after = cache.get_or_learn_at(&history(1), &config, now);

        assert!(!Arc::ptr_eq(&before, &after));
        assert_ne!(before.fingerprint, after.fingerprint);

        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_bounds_the_memo() {
        let cache = ModelCache::new(2);
        let config = EngineConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        for extra in 0..5 {
            cache.get_or_learn_at(&history(extra), &config, now);
        }

        assert!(cache.len() <= 2);
    }

    #[test]
    fn reused_model_ranks_like_a_fresh_one_later() {
        let cache = ModelCache::default();
        // Keep repurchase signals quiet so category balance decides the ranking.
        let engine = SuggestionEngine::new(EngineConfig {
            pattern_probability_threshold: 1.0,
            single_purchase_suggest_days: 10_000,
            ..EngineConfig::default()
        });
        let learned_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let later = learned_at + Duration::days(400);

        let mut records = Vec::new();
        for week in 0..2 {
            let day = learned_at - Duration::days(90 - week * 7);
            records.push(PurchaseRecord::new("milk", "dairy", day).unwrap());
            records.push(PurchaseRecord::new("cheese", "dairy", day).unwrap());
        }
        for _ in 0..4 {
            records.push(PurchaseRecord::new("apples", "fruits", learned_at).unwrap());
        }
        let history = PurchaseHistory::new(records);
        let list = ShoppingList::from_names(["apples"]);

        let cached = cache.get_or_learn_at(&history, engine.config(), learned_at);
        let reused = cache.get_or_learn_at(&history, engine.config(), later);
        assert!(Arc::ptr_eq(&cached, &reused));

        let from_cache = engine.suggest(&reused, &list, later);
        let balance = from_cache
            .iter()
            .find(|suggestion| suggestion.rule_type == RuleType::CategoryBalance)
            .expect("dairy is missing from the list");
        assert_eq!(balance.category, "dairy");
        assert!(balance.confidence > 0.5);
        assert_eq!(from_cache, engine.generate_suggestions_at(&list, &history, later));
    }

    #[test]
    fn concurrent_misses_share_one_model() {
        let cache = ModelCache::default();
        let config = EngineConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let history = history(2);

        let models: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| cache.get_or_learn_at(&history, &config, now)))
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        assert!(models.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
