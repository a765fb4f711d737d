// gsq/src/commands/mod.rs

pub mod inspect;
pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use gsq_core::domain::AnnotationConfig;
use gsq_core::infrastructure::config::load_config;

use crate::cli::ConfigArgs;

/// Loads the config and anchors its relative paths on the project directory.
pub fn load(args: &ConfigArgs) -> anyhow::Result<AnnotationConfig> {
    let mut config = load_config(args.config.as_deref(), &args.project_dir).with_context(|| {
        format!("Failed to load configuration from {:?}", args.project_dir)
    })?;

    if let Some(dataset) = &config.production_dataset {
        if Path::new(dataset).is_relative() {
            config.production_dataset = Some(args.project_dir.join(dataset).to_string_lossy().into_owned());
        }
    }
    if config.output.directory.is_relative() {
        config.output.directory = args.project_dir.join(&config.output.directory);
    }
    Ok(config)
}
