//! `bumpversion` invocation.

use std::path::Path;

use cbx_core::{Invocation, ProcessRunner};

use crate::error::{ReleaseError, Result};

const NEW_VERSION_PREFIX: &str = "new_version=";

/// The version out of `bumpversion --list` output, whose last line is
/// `new_version=<version>`.
pub fn parse_bump_output(output: &str) -> Result<String> {
    let last = output.lines().last().unwrap_or_default();
    last.strip_prefix(NEW_VERSION_PREFIX)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ReleaseError::MalformedBumpOutput(last.to_string()))
}

/// `bumpversion <segment> --allow-dirty --list` in `repo`.
pub async fn bump_version(runner: &dyn ProcessRunner, repo: &Path, segment: &str) -> Result<String> {
    let out = runner
        .run_checked(
            &Invocation::new("bumpversion")
                .args([segment, "--allow-dirty", "--list"])
                .current_dir(repo),
        )
        .await?;
    parse_bump_output(&out.stdout)
}
