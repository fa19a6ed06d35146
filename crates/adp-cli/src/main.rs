mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "adp", version, about = "Small-scale ETL pipeline runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline once
    Run {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Directory relative source paths are resolved against
        #[arg(long)]
        workdir: Option<PathBuf>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a pipeline and its state store without running it
    Check {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
    /// List registered plugins
    Plugins {
        /// Print as JSON, including parameter schemas
        #[arg(long)]
        json: bool,
    },
    /// Show the stored incremental state of a pipeline's source
    State {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            pipeline,
            workdir,
            json,
        } => commands::run::execute(&pipeline, workdir.as_deref(), json),
        Commands::Check { pipeline } => commands::check::execute(&pipeline),
        Commands::Plugins { json } => commands::plugins::execute(json),
        Commands::State { pipeline } => commands::state::execute(&pipeline),
    }
}
