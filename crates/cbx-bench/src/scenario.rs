//! Launcher discovery.

use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};

/// Directory holding the benchmarking provider, relative to the bench dir.
pub const PROVIDER_DIR: &str = "benchmarking-provider";

/// Where to get the benchmarking provider from.
pub const PROVIDER_URL: &str =
    "https://git.launchpad.net/~checkbox-dev/checkbox/+git/benchmarking-provider";

/// Launcher files are named `launcher-<scenario>`.
pub const LAUNCHER_PREFIX: &str = "launcher-";

/// One benchmark scenario.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Scenario {
    pub name: String,
    pub launcher: PathBuf,
}

/// Fail unless `provider_dir` contains the provider's `manage.py`.
pub fn check_provider(provider_dir: &Path) -> Result<()> {
    if provider_dir.join("manage.py").is_file() {
        return Ok(());
    }
    Err(BenchError::ProviderMissing {
        path: provider_dir.to_path_buf(),
        url: PROVIDER_URL,
    })
}

/// Every `launcher-*` file in `provider_dir`, sorted by scenario name.
pub fn discover_scenarios(provider_dir: &Path) -> Result<Vec<Scenario>> {
    let mut scenarios = Vec::new();
    for entry in std::fs::read_dir(provider_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name
            .to_str()
            .and_then(|n| n.strip_prefix(LAUNCHER_PREFIX))
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        scenarios.push(Scenario {
            name: name.to_string(),
            launcher: path,
        });
    }
    scenarios.sort();
    Ok(scenarios)
}
