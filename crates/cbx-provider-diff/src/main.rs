//! `cbx-provider-diff` - compare job listings of two provider revisions.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cbx_core::{init_tracing, ConsoleStyle, LogConfig, SystemRunner};
use cbx_provider_diff::{run_comparisons, ComparisonConfig, SetupOptions, Workspace};
use clap::Parser;
use tracing::{error, Level};

#[derive(Parser)]
#[command(name = "cbx-provider-diff")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plainbox Provider Comparison Tool", long_about = None)]
struct Cli {
    /// YAML file describing the compared providers
    #[arg(default_value = "provider_diff.yaml")]
    configuration: PathBuf,

    /// Script that bootstraps checkbox-project inside the working directory
    #[arg(long, default_value = "bootstrap-checkbox.sh")]
    bootstrap_script: PathBuf,

    /// Remove the working directory when done
    #[arg(long)]
    cleanup: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(e) = init_tracing(&LogConfig::new(level).console(ConsoleStyle::Full)) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ComparisonConfig::load(&cli.configuration)?;

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let bootstrap_script = cwd.join(&cli.bootstrap_script);
    let options = SetupOptions {
        parent_dir: cwd,
        bootstrap_script,
        cleanup: cli.cleanup,
    };

    let runner = SystemRunner;
    let workspace = Workspace::setup(&runner, &config, &options).await?;
    let report = run_comparisons(&runner, &workspace).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
