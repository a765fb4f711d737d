// gsq/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::run::RunOverrides;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug gsq run ... pour voir les détails (logs sur stderr)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: ANNOTATION RUN ---
        Commands::Run {
            config,
            dataset,
            output_dir,
            connection,
        } => {
            commands::run::execute(
                config,
                RunOverrides {
                    dataset,
                    output_dir,
                    connection,
                },
            )
            .await?;
        }

        // --- USE CASE: OFFLINE CONFIG CHECK ---
        Commands::Validate { config } => {
            commands::validate::execute(config)?;
        }

        // --- USE CASE: INSPECT AN OUTPUT ---
        Commands::Inspect { file, limit } => {
            commands::inspect::execute(&file, limit).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run_defaults() {
        let args = Cli::parse_from(["gsq", "run"]);
        match args.command {
            Commands::Run {
                config,
                dataset,
                output_dir,
                connection,
            } => {
                assert_eq!(config.project_dir.to_string_lossy(), ".");
                assert_eq!(config.config, None);
                assert_eq!(dataset, None);
                assert_eq!(output_dir, None);
                assert_eq!(connection, None);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_overrides() {
        let args = Cli::parse_from([
            "gsq",
            "run",
            "--dataset",
            "prod.csv",
            "--connection",
            "test_connection",
            "--project-dir",
            "/tmp",
            "-c",
            "/tmp/gsq.yaml",
        ]);
        match args.command {
            Commands::Run {
                config,
                dataset,
                connection,
                ..
            } => {
                assert_eq!(config.project_dir.to_string_lossy(), "/tmp");
                assert_eq!(config.config.unwrap().to_string_lossy(), "/tmp/gsq.yaml");
                assert_eq!(dataset, Some("prod.csv".to_string()));
                assert_eq!(connection, Some("test_connection".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_inspect() {
        let args = Cli::parse_from(["gsq", "inspect", "--file", "out/histogram.csv"]);
        match args.command {
            Commands::Inspect { file, limit } => {
                assert_eq!(file.to_string_lossy(), "out/histogram.csv");
                assert_eq!(limit, 20);
            }
            _ => panic!("Expected Inspect command"),
        }
    }
}
