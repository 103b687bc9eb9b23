use std::path::Path;

use pantrywise_core::{ApplicationError, SuggestionEngine};
use serde_json::json;
use tracing::info;

use crate::commands::suggest::resolve_now;
use crate::commands::{load_config, read_history, to_data, write_json, CommandResult};

/// Learn a model and either print it or write it to `output`.
pub fn run(
    config_path: Option<&Path>,
    history_path: &Path,
    output: Option<&Path>,
    now: Option<&str>,
) -> CommandResult {
    match learn(config_path, history_path, output, now) {
        Ok(result) => result,
        Err(error) => CommandResult::from_error("learn", &error),
    }
}

fn learn(
    config_path: Option<&Path>,
    history_path: &Path,
    output: Option<&Path>,
    now: Option<&str>,
) -> Result<CommandResult, ApplicationError> {
    let config = load_config(config_path)?;
    let now = resolve_now(now)?;
    let report = read_history(history_path)?;

    let model = SuggestionEngine::new(config.engine).learn(&report.history, now);
    let insights = to_data(&model.insights())?;

    let (message, model_data) = match output {
        Some(path) => {
            write_json(path, &model)?;
            info!(
                event_name = "cli.learn.model_written",
                path = %path.display(),
                fingerprint = %model.fingerprint,
                "wrote learned model"
            );
            (format!("wrote learned model to {}", path.display()), None)
        }
        None => (format!("learned model {}", model.fingerprint), Some(to_data(&model)?)),
    };

    let mut data = json!({
        "fingerprint": model.fingerprint.as_str(),
        "insights": insights,
        "skipped_records": to_data(&report.skipped)?,
    });
    if let Some(model_data) = model_data {
        data["model"] = model_data;
    }

    Ok(CommandResult::success_with_data("learn", message, Some(data)))
}
