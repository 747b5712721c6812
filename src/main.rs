//! Splitlab CLI entry point.

use clap::Parser;

use splitlab::cli::{Cli, Commands};
use splitlab::domain::models::LoggingConfig;
use splitlab::infrastructure::{config::ConfigLoader, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Before `splitlab init` there is no config file; fall back to the
    // default logging setup rather than failing.
    let logging_config = ConfigLoader::load()
        .map(|c| c.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    if let Err(err) = logging::init(&logging_config) {
        eprintln!("Warning: failed to initialize logging: {err}");
    }

    let result = match cli.command {
        Commands::Init(args) => splitlab::cli::commands::init::execute(args, cli.json).await,
        Commands::Test(args) => splitlab::cli::commands::test::execute(args, cli.json).await,
        Commands::Track(args) => splitlab::cli::commands::track::execute(args, cli.json).await,
        Commands::Evaluate(args) => splitlab::cli::commands::evaluate::execute(args, cli.json).await,
        Commands::Suggest(args) => splitlab::cli::commands::suggest::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        splitlab::cli::handle_error(err, cli.json);
    }
}
