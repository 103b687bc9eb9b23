use std::path::Path;

use pantrywise_core::{analyze_patterns, ApplicationError};
use serde_json::json;

use crate::commands::{read_history, to_data, CommandResult};

pub fn run(history_path: &Path) -> CommandResult {
    match analyze(history_path) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error("analyze", &error),
    }
}

fn analyze(history_path: &Path) -> Result<CommandResult, ApplicationError> {
    let report = read_history(history_path)?;
    let summary = analyze_patterns(&report.history);

    let message = if summary.total_purchases == 0 {
        "no purchase history available for analysis".to_string()
    } else {
        format!(
            "{} purchases of {} items across {} categories",
            summary.total_purchases, summary.unique_items, summary.categories_count
        )
    };

    let data = json!({
        "summary": to_data(&summary)?,
        "skipped_records": to_data(&report.skipped)?,
    });

    Ok(CommandResult::success_with_data("analyze", message, Some(data)))
}
