use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Tuning knobs for the mining and ranking pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum basket count (and co-occurrence count) for an association rule.
    pub min_support: u32,
    /// Rules at or below this confidence are discarded.
    pub min_confidence: f64,
    /// Seasonal profiles must score above this to surface as a suggestion.
    pub seasonal_threshold: f64,
    pub max_suggestions: usize,
    pub cluster_seed: u64,
    /// Days after which a once-bought item is proposed again.
    pub single_purchase_suggest_days: i64,
    pub pattern_probability_threshold: f64,
    /// A category must have been bought more than this many times to be balanced.
    pub category_min_purchases: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub min_support: Option<u32>,
    pub min_confidence: Option<f64>,
    pub seasonal_threshold: Option<f64>,
    pub max_suggestions: Option<usize>,
    pub cluster_seed: Option<u64>,
    pub single_purchase_suggest_days: Option<i64>,
    pub pattern_probability_threshold: Option<f64>,
    pub category_min_purchases: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_support: 2,
            min_confidence: 0.3,
            seasonal_threshold: 0.2,
            max_suggestions: 15,
            cluster_seed: 42,
            single_purchase_suggest_days: 14,
            pattern_probability_threshold: 0.7,
            category_min_purchases: 3,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_support == 0 {
            return Err(ConfigError::Validation(
                "engine.min_support must be greater than zero".to_string(),
            ));
        }

        for (key, value) in [
            ("engine.min_confidence", self.min_confidence),
            ("engine.seasonal_threshold", self.seasonal_threshold),
            ("engine.pattern_probability_threshold", self.pattern_probability_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=1.0")));
            }
        }

        if self.max_suggestions == 0 {
            return Err(ConfigError::Validation(
                "engine.max_suggestions must be greater than zero".to_string(),
            ));
        }

        if self.single_purchase_suggest_days < 0 {
            return Err(ConfigError::Validation(
                "engine.single_purchase_suggest_days must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("pantrywise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(engine) = patch.engine {
            if let Some(min_support) = engine.min_support {
                self.engine.min_support = min_support;
            }
            if let Some(min_confidence) = engine.min_confidence {
                self.engine.min_confidence = min_confidence;
            }
            if let Some(seasonal_threshold) = engine.seasonal_threshold {
                self.engine.seasonal_threshold = seasonal_threshold;
            }
            if let Some(max_suggestions) = engine.max_suggestions {
                self.engine.max_suggestions = max_suggestions;
            }
            if let Some(cluster_seed) = engine.cluster_seed {
                self.engine.cluster_seed = cluster_seed;
            }
            if let Some(days) = engine.single_purchase_suggest_days {
                self.engine.single_purchase_suggest_days = days;
            }
            if let Some(threshold) = engine.pattern_probability_threshold {
                self.engine.pattern_probability_threshold = threshold;
            }
            if let Some(category_min_purchases) = engine.category_min_purchases {
                self.engine.category_min_purchases = category_min_purchases;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PANTRYWISE_MIN_SUPPORT") {
            self.engine.min_support = parse_env("PANTRYWISE_MIN_SUPPORT", &value)?;
        }
        if let Some(value) = read_env("PANTRYWISE_MIN_CONFIDENCE") {
            self.engine.min_confidence = parse_env("PANTRYWISE_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = read_env("PANTRYWISE_SEASONAL_THRESHOLD") {
            self.engine.seasonal_threshold = parse_env("PANTRYWISE_SEASONAL_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("PANTRYWISE_MAX_SUGGESTIONS") {
            self.engine.max_suggestions = parse_env("PANTRYWISE_MAX_SUGGESTIONS", &value)?;
        }
        if let Some(value) = read_env("PANTRYWISE_CLUSTER_SEED") {
            self.engine.cluster_seed = parse_env("PANTRYWISE_CLUSTER_SEED", &value)?;
        }
        if let Some(value) = read_env("PANTRYWISE_SINGLE_PURCHASE_SUGGEST_DAYS") {
            self.engine.single_purchase_suggest_days =
                parse_env("PANTRYWISE_SINGLE_PURCHASE_SUGGEST_DAYS", &value)?;
        }
        if let Some(value) = read_env("PANTRYWISE_PATTERN_PROBABILITY_THRESHOLD") {
            self.engine.pattern_probability_threshold =
                parse_env("PANTRYWISE_PATTERN_PROBABILITY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("PANTRYWISE_CATEGORY_MIN_PURCHASES") {
            self.engine.category_min_purchases =
                parse_env("PANTRYWISE_CATEGORY_MIN_PURCHASES", &value)?;
        }

        let log_level =
            read_env("PANTRYWISE_LOGGING_LEVEL").or_else(|| read_env("PANTRYWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PANTRYWISE_LOGGING_FORMAT").or_else(|| read_env("PANTRYWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(min_support) = overrides.min_support {
            self.engine.min_support = min_support;
        }
        if let Some(min_confidence) = overrides.min_confidence {
            self.engine.min_confidence = min_confidence;
        }
        if let Some(seasonal_threshold) = overrides.seasonal_threshold {
            self.engine.seasonal_threshold = seasonal_threshold;
        }
        if let Some(max_suggestions) = overrides.max_suggestions {
            self.engine.max_suggestions = max_suggestions;
        }
        if let Some(cluster_seed) = overrides.cluster_seed {
            self.engine.cluster_seed = cluster_seed;
        }
        if let Some(days) = overrides.single_purchase_suggest_days {
            self.engine.single_purchase_suggest_days = days;
        }
        if let Some(threshold) = overrides.pattern_probability_threshold {
            self.engine.pattern_probability_threshold = threshold;
        }
        if let Some(category_min_purchases) = overrides.category_min_purchases {
            self.engine.category_min_purchases = category_min_purchases;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pantrywise.toml"), PathBuf::from("config/pantrywise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    engine: Option<EnginePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    min_support: Option<u32>,
    min_confidence: Option<f64>,
    seasonal_threshold: Option<f64>,
    max_suggestions: Option<usize>,
    cluster_seed: Option<u64>,
    single_purchase_suggest_days: Option<i64>,
    pattern_probability_threshold: Option<f64>,
    category_min_purchases: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
