use std::path::Path;

use chrono::{DateTime, Utc};
use pantrywise_core::domain::purchase::parse_purchase_date;
use pantrywise_core::{ApplicationError, ShoppingList, SuggestionEngine};
use serde_json::json;
use tracing::info;

use crate::commands::{load_config, read_history, to_data, CommandResult};

pub fn run(
    config_path: Option<&Path>,
    history_path: &Path,
    list: &[String],
    now: Option<&str>,
) -> CommandResult {
    match suggest(config_path, history_path, list, now) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error("suggest", &error),
    }
}

fn suggest(
    config_path: Option<&Path>,
    history_path: &Path,
    list: &[String],
    now: Option<&str>,
) -> Result<CommandResult, ApplicationError> {
    let config = load_config(config_path)?;
    let now = resolve_now(now)?;
    let report = read_history(history_path)?;
    let list = shopping_list(list);

    let engine = SuggestionEngine::new(config.engine);
    let model = engine.learn(&report.history, now);
    let suggestions = engine.suggest(&model, &list, now);

    info!(
        event_name = "cli.suggest.completed",
        purchases = report.history.len(),
        skipped = report.skipped.len(),
        suggestions = suggestions.len(),
        "generated suggestions"
    );

    let data = json!({
        "suggestions": to_data(&suggestions)?,
        "insights": to_data(&model.insights())?,
        "skipped_records": to_data(&report.skipped)?,
    });

    Ok(CommandResult::success_with_data(
        "suggest",
        format!("{} suggestions from {} purchases", suggestions.len(), report.history.len()),
        Some(data),
    ))
}

/// Entries are `name` or `name:category`.
fn shopping_list(entries: &[String]) -> ShoppingList {
    let mut list = ShoppingList::new();
    for entry in entries {
        match entry.split_once(':') {
            Some((name, category)) => list.add(name, Some(category)),
            None => list.add(entry, None),
        }
    }
    list
}

pub(crate) fn resolve_now(value: Option<&str>) -> Result<DateTime<Utc>, ApplicationError> {
    match value {
        None => Ok(Utc::now()),
        Some(raw) => parse_purchase_date(raw.trim())
            .ok_or_else(|| ApplicationError::Input(format!("`--now` value `{raw}` is not a date"))),
    }
}
