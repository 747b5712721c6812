//! Implementation of the `splitlab init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Wipe and reinitialize an existing project
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if let Some(path) = &self.config_path {
            lines.push(format!("Configuration written to {}", path.display()));
        }
        if let Some(path) = &self.database_path {
            lines.push(format!("Database initialized at {}", path.display()));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let splitlab_dir = target.join(".splitlab");

    if splitlab_dir.exists() {
        if !args.force {
            output(
                &InitOutput {
                    success: false,
                    message: "Project already initialized. Use --force to reinitialize."
                        .to_string(),
                    config_path: None,
                    database_path: None,
                },
                json_mode,
            );
            return Ok(());
        }
        fs::remove_dir_all(&splitlab_dir)
            .await
            .context("Failed to remove existing .splitlab directory")?;
    }

    fs::create_dir_all(&splitlab_dir)
        .await
        .with_context(|| format!("Failed to create {}", splitlab_dir.display()))?;

    let config_path = splitlab_dir.join("config.yaml");
    let rendered = serde_yaml::to_string(&Config::default())
        .context("Failed to serialize default configuration")?;
    fs::write(&config_path, rendered)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let database_path = splitlab_dir.join("splitlab.db");
    initialize_database(&format!("sqlite:{}", database_path.display()))
        .await
        .context("Failed to initialize database")?;

    output(
        &InitOutput {
            success: true,
            message: if args.force {
                "Project reinitialized.".to_string()
            } else {
                "Project initialized.".to_string()
            },
            config_path: Some(config_path),
            database_path: Some(database_path),
        },
        json_mode,
    );
    Ok(())
}
