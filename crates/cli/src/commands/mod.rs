pub mod analyze;
pub mod config;
pub mod learn;
pub mod suggest;

use std::fs;
use std::path::Path;

use anyhow::Context;
use pantrywise_core::config::{AppConfig, LoadOptions};
use pantrywise_core::{ApplicationError, IngestReport, PurchaseHistory, RawPurchaseRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub fn load_options(config_path: Option<&Path>) -> LoadOptions {
    LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    }
}

pub(crate) fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ApplicationError> {
    Ok(AppConfig::load(load_options(config_path))?)
}

/// Purchase history files are either a bare array of records or `{"purchases": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistorySnapshot {
    Records(Vec<RawPurchaseRecord>),
    Wrapped { purchases: Vec<RawPurchaseRecord> },
}

pub(crate) fn read_history(path: &Path) -> Result<IngestReport, ApplicationError> {
    read_snapshot(path)
        .map(PurchaseHistory::ingest)
        .map_err(|error| ApplicationError::Input(format!("{error:#}")))
}

fn read_snapshot(path: &Path) -> anyhow::Result<Vec<RawPurchaseRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read purchase history `{}`", path.display()))?;
    let snapshot: HistorySnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("purchase history `{}` is not valid JSON", path.display()))?;

    Ok(match snapshot {
        HistorySnapshot::Records(records) => records,
        HistorySnapshot::Wrapped { purchases } => purchases,
    })
}

pub(crate) fn write_json(path: &Path, value: &impl Serialize) -> Result<(), ApplicationError> {
    write_json_file(path, value).map_err(|error| ApplicationError::Output(format!("{error:#}")))
}

fn write_json_file(path: &Path, value: &impl Serialize) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("could not serialize output")?;
    fs::write(path, rendered).with_context(|| format!("could not write `{}`", path.display()))
}

pub(crate) fn to_data(value: &impl Serialize) -> Result<Value, ApplicationError> {
    serde_json::to_value(value).map_err(|error| ApplicationError::Output(error.to_string()))
}
