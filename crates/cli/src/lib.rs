pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pantrywise_core::config::{AppConfig, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "pantrywise",
    about = "Pantrywise purchase-pattern CLI",
    long_about = "Mine a purchase history snapshot for repurchase, co-purchase, seasonal and similarity patterns, and rank shopping suggestions.",
    after_help = "Examples:\n  pantrywise suggest --history purchases.json --list milk,eggs:protein\n  pantrywise analyze --history purchases.json\n  pantrywise learn --history purchases.json --output model.json\n  pantrywise config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file (defaults to pantrywise.toml or config/pantrywise.toml)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Rank suggestions for a shopping list from a purchase history")]
    Suggest {
        #[arg(long, help = "Purchase history JSON file")]
        history: PathBuf,
        #[arg(long, value_delimiter = ',', help = "Comma-separated items already on the list, optionally as name:category")]
        list: Vec<String>,
        #[arg(long, help = "Evaluate as of this date or RFC 3339 timestamp instead of now")]
        now: Option<String>,
    },
    #[command(about = "Summarise shopping patterns in a purchase history")]
    Analyze {
        #[arg(long, help = "Purchase history JSON file")]
        history: PathBuf,
    },
    #[command(about = "Learn a pattern model and print it or write it to a file")]
    Learn {
        #[arg(long, help = "Purchase history JSON file")]
        history: PathBuf,
        #[arg(long, help = "Write the learned model here instead of printing it")]
        output: Option<PathBuf>,
        #[arg(long, help = "Evaluate as of this date or RFC 3339 timestamp instead of now")]
        now: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Config errors surface through the command's own payload.
    if let Ok(config) = AppConfig::load(commands::load_options(config_path)) {
        init_logging(&config.logging);
    }

    let result = match &cli.command {
        Command::Suggest { history, list, now } => {
            commands::suggest::run(config_path, history, list, now.as_deref())
        }
        Command::Analyze { history } => commands::analyze::run(history),
        Command::Learn { history, output, now } => {
            commands::learn::run(config_path, history, output.as_deref(), now.as_deref())
        }
        Command::Config => commands::config::run(config_path),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON payload.
fn init_logging(logging: &LoggingConfig) {
    use pantrywise_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match logging.format {
        Compact => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .compact()
                .init();
        }
        Pretty => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .pretty()
                .init();
        }
        Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .json()
                .init();
        }
    }
}
