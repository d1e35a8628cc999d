//! `checkbox-cli list*` commands and their output parsers.

use cbx_core::{Invocation, ProcessRunner};
use tracing::warn;

use crate::error::Result;
use crate::workspace::{Side, Workspace};

/// One id per non-blank line.
pub fn parse_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Test plan ids out of `checkbox-cli list "test plan"`.
///
/// Relevant lines look like `test plan '2000.foo.bar::tp-name'`; the id is
/// whatever sits between the last two apostrophes.
pub fn parse_test_plans(output: &str) -> Vec<String> {
    let mut plans = Vec::new();
    for line in output.lines().filter(|l| l.starts_with("test plan")) {
        match line.rsplit('\'').nth(1) {
            Some(id) if line.matches('\'').count() >= 2 => plans.push(id.to_string()),
            _ => warn!("ignoring malformed test plan line: {line}"),
        }
    }
    plans
}

fn checkbox_cli(workspace: &Workspace, side: Side) -> Invocation {
    workspace
        .venv(side)
        .command("checkbox-cli")
        .current_dir(workspace.project_dir())
}

/// Ids of every job definition known to `side`.
pub async fn job_definitions(
    runner: &dyn ProcessRunner,
    workspace: &Workspace,
    side: Side,
) -> Result<Vec<String>> {
    let inv = checkbox_cli(workspace, side).args(["list", "all-jobs", "-f", r"{id}\n"]);
    let out = runner.run_checked(&inv).await?;
    Ok(parse_ids(&out.stdout))
}

/// Ids of every test plan known to `side`.
pub async fn test_plans(
    runner: &dyn ProcessRunner,
    workspace: &Workspace,
    side: Side,
) -> Result<Vec<String>> {
    let inv = checkbox_cli(workspace, side).args(["list", "test plan"]);
    let out = runner.run_checked(&inv).await?;
    Ok(parse_test_plans(&out.stdout))
}

/// Jobs `test_plan` resolves to on `side`.
pub async fn bootstrapped_jobs(
    runner: &dyn ProcessRunner,
    workspace: &Workspace,
    side: Side,
    test_plan: &str,
) -> Result<Vec<String>> {
    let inv = checkbox_cli(workspace, side).args(["list-bootstrapped", test_plan]);
    let out = runner.run_checked(&inv).await?;
    Ok(parse_ids(&out.stdout))
}
