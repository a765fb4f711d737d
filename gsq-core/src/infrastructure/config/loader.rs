// gsq-core/src/infrastructure/config/loader.rs

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::domain::config::AnnotationConfig;
use crate::infrastructure::error::InfrastructureError;

pub const ENV_CONNECTION: &str = "GSQ_CONNECTION";
pub const ENV_SAMPLE_RATE: &str = "GSQ_SAMPLE_RATE";
pub const ENV_OUTPUT_DIR: &str = "GSQ_OUTPUT_DIR";

const CANDIDATES: [&str; 2] = ["gsq.yaml", "gsq.yml"];

/// Loads the run configuration, then layers environment overrides on top.
/// An explicit `path` wins over discovery in `project_dir`.
#[instrument(skip(project_dir))]
pub fn load_config(
    path: Option<&Path>,
    project_dir: &Path,
) -> Result<AnnotationConfig, InfrastructureError> {
    let config_path = match path {
        Some(p) if p.exists() => p.to_path_buf(),
        Some(p) => {
            return Err(InfrastructureError::ConfigNotFound(p.display().to_string()));
        }
        None => find_config(project_dir)?,
    };
    info!(path = ?config_path, "Loading annotation config");

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config at {:?}", config_path))?;
    let mut config = parse_config(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

pub fn find_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CANDIDATES
    )))
}

pub fn parse_config(content: &str) -> Result<AnnotationConfig, InfrastructureError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Layering: `GSQ_CONNECTION=test_connection gsq run`.
/// `lookup` is injected so tests don't mutate the process environment.
pub fn apply_env_overrides<F>(
    config: &mut AnnotationConfig,
    lookup: F,
) -> Result<(), InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_CONNECTION) {
        info!(new = %val, "Overriding connection via ENV");
        config.workspace_connection_arm_id = val;
    }
    if let Some(val) = lookup(ENV_SAMPLE_RATE) {
        let rate: f64 = val.trim().parse().map_err(|_| {
            InfrastructureError::ConfigError(format!("{} is not a number: {}", ENV_SAMPLE_RATE, val))
        })?;
        info!(old = config.sample_rate, new = rate, "Overriding sample rate via ENV");
        config.sample_rate = rate;
    }
    if let Some(val) = lookup(ENV_OUTPUT_DIR) {
        info!(old = ?config.output.directory, new = %val, "Overriding output directory via ENV");
        config.output.directory = PathBuf::from(val);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::config::OutputFormat;
    use anyhow::Result;
    use std::collections::HashMap;
    use tempfile::tempdir;

    const YAML: &str = r#"
metric_names: Fluency,Coherence
workspace_connection_arm_id: test_connection
production_dataset: data/prod.csv
sample_rate: 0.5
seed: 7
thresholds:
  fluency: 3
columns:
  prompt: question
  completion: answer
output:
  directory: out
  format: csv
"#;

    #[test]
    fn test_parse_fills_defaults() -> Result<()> {
        let config = parse_config(YAML)?;
        assert_eq!(config.sample_rate, 0.5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.thresholds.fluency, 3);
        assert_eq!(config.thresholds.coherence, 4);
        assert_eq!(config.columns.prompt, "question");
        assert_eq!(config.columns.context, "context");
        assert_eq!(config.request.top_p, 1.0);
        assert_eq!(config.endpoint.api_call_retry_max_count, 10);
        assert_eq!(config.execution.batch_size, 64);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.check()?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_discovery_and_missing() -> Result<()> {
        let dir = tempdir()?;
        assert!(matches!(
            load_config(None, dir.path()),
            Err(InfrastructureError::ConfigNotFound(_))
        ));

        fs::write(dir.path().join("gsq.yml"), YAML)?;
        let config = load_config(None, dir.path())?;
        assert_eq!(config.metric_names, "Fluency,Coherence");
        Ok(())
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let err = load_config(Some(Path::new("/nope/gsq.yaml")), Path::new("."));
        assert!(matches!(err, Err(InfrastructureError::ConfigNotFound(_))));
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let mut config = parse_config(YAML)?;
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_CONNECTION, "/subscriptions/s/resourceGroups/r/providers/Microsoft.MachineLearningServices/workspaces/w/connections/c"),
            (ENV_SAMPLE_RATE, "0.25"),
            (ENV_OUTPUT_DIR, "/tmp/gsq-out"),
        ]);
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()))?;

        assert!(config.workspace_connection_arm_id.starts_with("/subscriptions/s/"));
        assert_eq!(config.sample_rate, 0.25);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/gsq-out"));
        Ok(())
    }

    #[test]
    fn test_bad_sample_rate_env() -> Result<()> {
        let mut config = parse_config(YAML)?;
        let err = apply_env_overrides(&mut config, |k| {
            (k == ENV_SAMPLE_RATE).then(|| "half".to_string())
        });
        assert!(matches!(err, Err(InfrastructureError::ConfigError(_))));
        Ok(())
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            parse_config("metric_names: [unclosed"),
            Err(InfrastructureError::YamlError(_))
        ));
    }
}
