//! Local and remote launcher timing.

use std::path::{Path, PathBuf};
use std::time::Instant;

use cbx_core::{Invocation, OutputMode, ProcessRunner, Venv};
use tracing::{info, warn};

use crate::error::{BenchError, Result, RunMode};
use crate::report::BenchResults;
use crate::scenario::{check_provider, discover_scenarios, Scenario, PROVIDER_DIR};

/// The test runner binary inside the venv.
pub const CHECKBOX_CLI: &str = "checkbox-cli";

/// Where the harness finds its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Directory containing `benchmarking-provider/`.
    pub bench_dir: PathBuf,
    /// checkbox-ng tree providing `mk-venv`.
    pub checkbox_dir: PathBuf,
}

impl BenchConfig {
    /// Bench dir inside a checkbox tree; `mk-venv` lives one level up.
    pub fn from_bench_dir(bench_dir: impl Into<PathBuf>) -> Self {
        let bench_dir = bench_dir.into();
        let checkbox_dir = bench_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| bench_dir.join(".."));
        Self {
            bench_dir,
            checkbox_dir,
        }
    }

    pub fn provider_dir(&self) -> PathBuf {
        self.bench_dir.join(PROVIDER_DIR)
    }
}

/// Runs launchers against one prepared venv.
pub struct BenchHarness<'a> {
    runner: &'a dyn ProcessRunner,
    config: BenchConfig,
    workdir: PathBuf,
    venv: Venv,
}

impl<'a> BenchHarness<'a> {
    /// Create the venv inside `workdir` and install the benchmarking provider
    /// into it.
    pub async fn prepare(
        runner: &'a dyn ProcessRunner,
        config: BenchConfig,
        workdir: &Path,
    ) -> Result<Self> {
        let venv = Venv::create(
            runner,
            &config.checkbox_dir,
            workdir.join("venv"),
            OutputMode::Capture,
        )
        .await
        .map_err(BenchError::Environment)?;

        venv.develop_provider(runner, &config.provider_dir().join("manage.py"), workdir)
            .await
            .map_err(BenchError::Environment)?;

        Ok(Self {
            runner,
            config,
            workdir: workdir.to_path_buf(),
            venv,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    fn checkbox_cli(&self) -> Invocation {
        self.venv
            .command(CHECKBOX_CLI)
            .current_dir(&self.workdir)
            .output(OutputMode::Capture)
    }

    /// Run `launcher` in-process and return the elapsed seconds.
    pub async fn run_locally(&self, launcher: &Path) -> Result<f64> {
        let inv = self.checkbox_cli().arg(launcher.to_string_lossy());
        let start = Instant::now();
        self.runner
            .run_checked(&inv)
            .await
            .map_err(|source| BenchError::LauncherFailed {
                mode: RunMode::Local,
                launcher: launcher.to_path_buf(),
                source,
            })?;
        Ok(start.elapsed().as_secs_f64())
    }

    /// Run `launcher` through a master talking to a freshly started slave and
    /// return the elapsed seconds of the master.
    ///
    /// The slave is terminated when this returns, whatever the outcome. A
    /// slave that exited on its own fails the run even if the master
    /// succeeded.
    pub async fn run_remotely(&self, launcher: &Path) -> Result<f64> {
        let slave_cmd = self.checkbox_cli().arg("slave").output(OutputMode::Inherit);
        let mut slave = self
            .runner
            .spawn_background(&slave_cmd)
            .await
            .map_err(BenchError::SlaveStart)?;

        let inv = self
            .checkbox_cli()
            .args(["master", "localhost"])
            .arg(launcher.to_string_lossy());
        let start = Instant::now();
        self.runner
            .run_checked(&inv)
            .await
            .map_err(|source| BenchError::LauncherFailed {
                mode: RunMode::Remote,
                launcher: launcher.to_path_buf(),
                source,
            })?;
        let elapsed = start.elapsed().as_secs_f64();

        if slave.has_exited()? {
            return Err(BenchError::SlaveDied);
        }
        if let Err(e) = slave.release() {
            warn!(error = %e, "could not signal the slave");
        }
        Ok(elapsed)
    }

    /// Every scenario, locally then remotely. Stops at the first failure.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> Result<BenchResults> {
        let mut results = BenchResults::new();
        for scenario in scenarios {
            info!(scenario = %scenario.name, "running locally");
            let local = self.run_locally(&scenario.launcher).await?;
            info!(scenario = %scenario.name, "running remotely");
            let remote = self.run_remotely(&scenario.launcher).await?;
            results.record(RunMode::Local, &scenario.name, local);
            results.record(RunMode::Remote, &scenario.name, remote);
        }
        Ok(results)
    }
}

/// Full benchmark: precondition check, temporary environment, every
/// discovered scenario. The temporary directory is removed on return.
pub async fn run_benchmark(runner: &dyn ProcessRunner, config: BenchConfig) -> Result<BenchResults> {
    let provider_dir = config.provider_dir();
    check_provider(&provider_dir)?;

    let tmp = tempfile::Builder::new().prefix("cbox-bench").tempdir()?;
    let scenarios = discover_scenarios(&provider_dir)?;
    info!("Found {} scenario(s) in {}", scenarios.len(), provider_dir.display());

    let harness = BenchHarness::prepare(runner, config, tmp.path()).await?;
    harness.run_all(&scenarios).await
}
