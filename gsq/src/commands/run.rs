// gsq/src/commands/run.rs
//
// USE CASE: Annotate a production dataset and emit histogram + violations.

use std::path::PathBuf;

use anyhow::Context;
use gsq_core::application::{AnnotationPipeline, RunOutcome};
use gsq_core::domain::SessionContext;

use crate::cli::ConfigArgs;

pub struct RunOverrides {
    pub dataset: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub connection: Option<String>,
}

pub async fn execute(args: ConfigArgs, overrides: RunOverrides) -> anyhow::Result<()> {
    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let mut config = super::load(&args)?;

    if let Some(dataset) = overrides.dataset {
        config.production_dataset = Some(dataset);
    }
    if let Some(dir) = overrides.output_dir {
        config.output.directory = dir;
    }
    if let Some(connection) = overrides.connection {
        config.workspace_connection_arm_id = connection;
    }
    println!("   Metrics: {}", config.metric_names);
    tracing::debug!(config = ?config, "Effective configuration");

    // B. Wire the adapters (DuckDB + reqwest + workspace identity)
    let session = SessionContext::from_env();
    let pipeline = AnnotationPipeline::from_config(&config, session)
        .context("Failed to initialize the annotation pipeline")?;

    // C. Run
    match pipeline.run(&config).await {
        Ok(RunOutcome::Completed(summary)) => {
            for metric in &summary.metrics {
                println!(
                    "   ➜ {}: {} violation(s) (threshold {})",
                    metric.metric, metric.violations, metric.threshold
                );
            }
            println!("\n✨ SUCCESS! Run {} annotated {} rows", summary.run_id, summary.rows_annotated);
        }
        Ok(RunOutcome::Aborted { stage, reason }) => {
            // no outputs, but not a failure of the job itself
            println!("\n⚠️  Run aborted at stage '{}': {}", stage, reason);
        }
        Err(e) => {
            eprintln!("\n💥 CRITICAL PIPELINE ERROR:");
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(1);
        }
    }

    Ok(())
}
