//! Event tracking CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::sqlite::{
    initialize_configured_database, SqliteEventRepository, SqliteTestRepository,
};
use crate::cli::commands::test::visitor_from_flags;
use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;
use crate::services::EventRecorder;

#[derive(Args, Debug)]
pub struct TrackArgs {
    #[command(subcommand)]
    pub command: TrackCommands,
}

#[derive(Subcommand, Debug)]
pub enum TrackCommands {
    /// Record that a visitor saw a variant
    Impression {
        /// Test ID
        test_id: Uuid,
        /// Variant ID
        variant_id: Uuid,
        /// Authenticated user id
        #[arg(short, long, conflicts_with = "session")]
        user: Option<String>,
        /// Anonymous session id
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Record that a visitor completed the goal action
    Conversion {
        /// Test ID
        test_id: Uuid,
        /// Variant ID
        variant_id: Uuid,
        /// Authenticated user id
        #[arg(short, long, conflicts_with = "session")]
        user: Option<String>,
        /// Anonymous session id
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Rebuild a test's cached counters from its event log
    Reconcile {
        /// Test ID
        test_id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct TrackOutput {
    pub success: bool,
    pub event_id: Option<String>,
    pub message: String,
}

impl CommandOutput for TrackOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: TrackArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let pool = initialize_configured_database(&config.database)
        .await
        .context("Failed to initialize database. Run 'splitlab init' first.")?;

    let test_repo = Arc::new(SqliteTestRepository::new(pool.clone()));
    let event_repo = Arc::new(SqliteEventRepository::new(pool));
    let recorder = EventRecorder::new(test_repo, event_repo);

    let out = match args.command {
        TrackCommands::Impression { test_id, variant_id, user, session } => {
            let visitor = visitor_from_flags(user, session)?;
            let event = recorder
                .record_impression(test_id, variant_id, &visitor)
                .await?;
            TrackOutput {
                success: true,
                event_id: Some(event.id.to_string()),
                message: format!("Impression recorded for variant {variant_id}."),
            }
        }
        TrackCommands::Conversion { test_id, variant_id, user, session } => {
            let visitor = visitor_from_flags(user, session)?;
            let event = recorder
                .record_conversion(test_id, variant_id, &visitor)
                .await?;
            TrackOutput {
                success: true,
                event_id: Some(event.id.to_string()),
                message: format!("Conversion recorded for variant {variant_id}."),
            }
        }
        TrackCommands::Reconcile { test_id } => {
            recorder.reconcile(test_id).await?;
            TrackOutput {
                success: true,
                event_id: None,
                message: format!("Counters for test {test_id} rebuilt from the event log."),
            }
        }
    };

    output(&out, json_mode);
    Ok(())
}
