//! `cbx-bench` - time Checkbox launchers locally and remotely.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cbx_bench::{run_benchmark, BenchConfig};
use cbx_core::{init_tracing, ConsoleStyle, LogConfig, SystemRunner};
use clap::Parser;
use tracing::{error, Level};

#[derive(Parser)]
#[command(name = "cbx-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark Checkbox with different scenarios", long_about = None)]
struct Cli {
    /// Directory containing the benchmarking-provider checkout
    #[arg(long, default_value = ".")]
    bench_dir: PathBuf,

    /// checkbox-ng tree providing mk-venv (default: parent of --bench-dir)
    #[arg(long)]
    checkbox_dir: Option<PathBuf>,

    /// Print the results as JSON
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
    let bench_dir = cli
        .bench_dir
        .canonicalize()
        .with_context(|| format!("Bench directory {:?} not found", cli.bench_dir))?;
    let mut config = BenchConfig::from_bench_dir(bench_dir);
    if let Some(dir) = cli.checkbox_dir {
        config.checkbox_dir = dir
            .canonicalize()
            .with_context(|| format!("Checkbox directory {:?} not found", dir))?;
    }

    let results = run_benchmark(&SystemRunner, config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{results}");
    }
    Ok(())
}
