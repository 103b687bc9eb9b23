use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pantrywise_core::ApplicationError;
use serde_json::{json, Map, Value};
use toml::Value as TomlValue;

use crate::commands::{load_config, to_data, CommandResult};

const FIELDS: &[(&str, &[&str])] = &[
    ("engine.min_support", &["PANTRYWISE_MIN_SUPPORT"]),
    ("engine.min_confidence", &["PANTRYWISE_MIN_CONFIDENCE"]),
    ("engine.seasonal_threshold", &["PANTRYWISE_SEASONAL_THRESHOLD"]),
    ("engine.max_suggestions", &["PANTRYWISE_MAX_SUGGESTIONS"]),
    ("engine.cluster_seed", &["PANTRYWISE_CLUSTER_SEED"]),
    ("engine.single_purchase_suggest_days", &["PANTRYWISE_SINGLE_PURCHASE_SUGGEST_DAYS"]),
    ("engine.pattern_probability_threshold", &["PANTRYWISE_PATTERN_PROBABILITY_THRESHOLD"]),
    ("engine.category_min_purchases", &["PANTRYWISE_CATEGORY_MIN_PURCHASES"]),
    ("logging.level", &["PANTRYWISE_LOGGING_LEVEL", "PANTRYWISE_LOG_LEVEL"]),
    ("logging.format", &["PANTRYWISE_LOGGING_FORMAT", "PANTRYWISE_LOG_FORMAT"]),
];

/// Effective configuration with the source each value came from.
pub fn run(config_path: Option<&Path>) -> CommandResult {
    match inspect(config_path) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error("config", &error),
    }
}

fn inspect(config_path: Option<&Path>) -> Result<CommandResult, ApplicationError> {
    let config = load_config(config_path)?;

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut sources = Map::new();
    for (key_path, env_keys) in FIELDS {
        sources.insert(
            (*key_path).to_string(),
            Value::String(field_source(
                key_path,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )),
        );
    }

    let data = json!({
        "engine": to_data(&config.engine)?,
        "logging": {
            "level": config.logging.level,
            "format": to_data(&config.logging.format)?,
        },
        "sources": sources,
    });

    Ok(CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        Some(data),
    ))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("pantrywise.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/pantrywise.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<TomlValue> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<TomlValue>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&TomlValue>,
    config_file_path: Option<&Path>,
) -> String {
    // First non-blank key wins, matching the loader.
    let env_key = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &TomlValue, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
