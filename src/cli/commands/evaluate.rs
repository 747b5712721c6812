//! Significance evaluation CLI command.

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::sqlite::{initialize_configured_database, SqliteTestRepository};
use crate::cli::output::{base_table, output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{Evaluation, SignificanceEvaluator, Verdict};

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Test ID
    pub test_id: Uuid,
}

#[derive(Debug, serde::Serialize)]
pub struct EvaluateOutput {
    pub evaluation: Evaluation,
}

impl CommandOutput for EvaluateOutput {
    fn to_human(&self) -> String {
        let eval = &self.evaluation;
        let mut lines = vec![
            format!("Test: {} ({})", eval.test_name, eval.test_id),
            format!("Status: {}", eval.status.as_str()),
            format!(
                "Evaluation: min {} impressions/variant at {:.0}% confidence",
                eval.min_sample_size,
                eval.confidence_level * 100.0
            ),
        ];

        let mut table = base_table(vec!["Variant", "Role", "Impr.", "Conv.", "Rate"]);
        for v in &eval.variants {
            table.add_row(vec![
                v.name.clone(),
                if v.is_control { "control" } else { "treatment" }.to_string(),
                v.impressions.to_string(),
                v.conversions.to_string(),
                format!("{:.2}%", v.conversion_rate * 100.0),
            ]);
        }
        lines.push(table.to_string());

        let verdict = match &eval.verdict {
            Verdict::InsufficientData => format!(
                "Verdict: insufficient data (every variant needs {} impressions)",
                eval.min_sample_size
            ),
            Verdict::NoSignificantDifference => {
                "Verdict: no significant difference".to_string()
            }
            Verdict::Winner(id) => {
                let name = eval
                    .variants
                    .iter()
                    .find(|v| v.variant_id == *id)
                    .map_or_else(|| id.to_string(), |v| v.name.clone());
                format!("Verdict: winner is '{name}' ({id})")
            }
        };
        lines.push(verdict);

        if let Some(p) = eval.p_value {
            lines.push(format!("p-value: {p:.4}"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.evaluation).unwrap_or_default()
    }
}

pub async fn execute(args: EvaluateArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let pool = initialize_configured_database(&config.database)
        .await
        .context("Failed to initialize database. Run 'splitlab init' first.")?;

    let evaluator = SignificanceEvaluator::new(Arc::new(SqliteTestRepository::new(pool)));
    let evaluation = evaluator.evaluate(args.test_id).await?;

    output(&EvaluateOutput { evaluation }, json_mode);
    Ok(())
}
