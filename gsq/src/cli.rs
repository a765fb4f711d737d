// gsq/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gsq")]
#[command(about = "Generation quality annotation histograms & threshold violations", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Config file (default: gsq.yaml / gsq.yml in the project directory)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Project directory, base for relative paths in the config file
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Annotates sampled production rows and writes histogram, violations and samples index
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Production dataset (CSV, Parquet or JSON), overrides the config file
        #[arg(long)]
        dataset: Option<String>,

        /// Output directory, overrides the config file
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Workspace connection ARM id, or 'test_connection'
        #[arg(long)]
        connection: Option<String>,
    },

    /// ✅ Validates the configuration without loading data or calling the endpoint
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// 🔍 Prints an emitted table (histogram, violations, samples index)
    Inspect {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}
