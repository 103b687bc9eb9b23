pub mod analysis;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod mining;
pub mod suggestions;

pub use analysis::{analyze_patterns, PatternSummary};
pub use cache::{HistoryFingerprint, ModelCache};
pub use config::{AppConfig, EngineConfig};
pub use domain::purchase::{
    IngestReport, PurchaseHistory, PurchaseRecord, RawPurchaseRecord, SkippedRecord,
};
pub use domain::shopping_list::ShoppingList;
pub use errors::{ApplicationError, DomainError};
pub use mining::{learn, LearnedModel, ModelInsights};
pub use suggestions::{RuleType, SignalInsights, Suggestion, SuggestionEngine};
