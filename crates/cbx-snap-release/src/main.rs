//! `cbx-snap-release` - tag content snap parts and update the release branch.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cbx_core::{init_tracing, ConsoleStyle, LogConfig, SystemRunner};
use cbx_snap_release::{Mode, PartLists, Release, ReleaseOptions, ReleaseTag};
use clap::Parser;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "cbx-snap-release")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tag checkbox content parts and update the release branch", long_about = None)]
struct Cli {
    /// Launchpad path of the packaging repository
    #[arg(value_name = "REPO")]
    repository: String,

    /// Branch the release is pushed to
    #[arg(value_name = "RELEASE_BRANCH")]
    release_branch: String,

    /// Branch to release from
    #[arg(short, long, default_value = "master", value_name = "BRANCH")]
    branch: String,

    /// Don't push the changes to remote repositories
    #[arg(short, long)]
    dry_run: bool,

    /// Rebase BRANCH onto this branch and force-push it as the release branch
    #[arg(short, long, alias = "rebase_branch", value_name = "REBASE_BRANCH", conflicts_with = "finish")]
    rebase_branch: Option<String>,

    /// Finish the release
    #[arg(short, long)]
    finish: bool,

    /// The part of the version to increase
    #[arg(short, long, alias = "increment_part", default_value = "release", value_name = "INCREMENT_PART")]
    increment_part: String,

    /// Launchpad user id used for pushes
    #[arg(short, long, value_name = "USER")]
    user: Option<String>,

    /// Skip the changelog against the previous release
    #[arg(long)]
    no_changelog: bool,

    /// Part never tagged by the release (repeatable, replaces the defaults)
    #[arg(long = "no-tag", value_name = "PART")]
    no_tag: Vec<String>,

    /// Part left untouched (repeatable, replaces the defaults)
    #[arg(long = "ignore", value_name = "PART")]
    ignore: Vec<String>,

    /// Scratch directory for the clones, wiped on start
    #[arg(long, default_value = "src", value_name = "DIR")]
    workdir: PathBuf,

    /// Debug log of the run, truncated on start
    #[arg(long, default_value = "release.log", value_name = "PATH")]
    log_file: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> ReleaseOptions {
        let mut options = ReleaseOptions::new(&self.repository, &self.release_branch);
        options.branch = self.branch.clone();
        options.mode = match (&self.rebase_branch, self.finish) {
            (Some(onto), _) => Mode::Rebase { onto: onto.clone() },
            (None, true) => Mode::Finish,
            (None, false) => Mode::Normal,
        };
        options.dry_run = self.dry_run;
        options.increment_part = self.increment_part.clone();
        options.user = self.user.clone();
        options.changelog = !self.no_changelog;
        let mut parts = PartLists::default();
        if !self.no_tag.is_empty() {
            parts.no_tag = self.no_tag.clone();
        }
        if !self.ignore.is_empty() {
            parts.ignore = self.ignore.clone();
        }
        options.parts = parts;
        options.workdir = self.workdir.clone();
        options
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let log_config = LogConfig::new(level)
        .console(ConsoleStyle::Plain)
        .log_file(&cli.log_file);
    if let Err(e) = init_tracing(&log_config) {
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
    let options = cli.options();
    let runner = SystemRunner;
    let release = Release::new(&runner, options, ReleaseTag::now());
    let report = release
        .run()
        .await
        .with_context(|| format!("Release of {} failed", release.options().snap_name()))?;

    if let Some(tag) = &report.release_tag {
        info!("Release {tag} finished");
    }
    if let Some(version) = &report.new_version {
        info!("{} is now at version {version}", release.options().snap_name());
    }
    Ok(())
}
