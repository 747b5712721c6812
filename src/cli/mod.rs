//! CLI interface: clap command definitions and output formatting.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::domain::errors::EngineError;

#[derive(Parser)]
#[command(name = "splitlab")]
#[command(about = "Splitlab - A/B experiment engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize splitlab configuration and database
    Init(commands::init::InitArgs),

    /// Test management commands
    Test(commands::test::TestArgs),

    /// Record impressions and conversions
    Track(commands::track::TrackArgs),

    /// Evaluate a test for statistical significance
    Evaluate(commands::evaluate::EvaluateArgs),

    /// Request variant content suggestions
    Suggest(commands::suggest::SuggestArgs),
}

/// Print a failed command's error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let kind = err
        .downcast_ref::<EngineError>()
        .map_or("error", error_kind);

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "kind": kind,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}

fn error_kind(err: &EngineError) -> &'static str {
    match err {
        EngineError::Validation { .. } => "validation",
        EngineError::NotFound { .. } => "not_found",
        EngineError::InvalidTransition { .. } => "invalid_transition",
        EngineError::Conflict(_) => "conflict",
        EngineError::Precondition(_) => "precondition",
        EngineError::Database(_) => "database",
        EngineError::Serialization(_) => "serialization",
    }
}
