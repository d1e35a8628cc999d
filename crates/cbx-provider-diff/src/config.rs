//! YAML comparison plan.
//!
//! ```yaml
//! before:
//!   source: https://git.launchpad.net/plainbox-provider-checkbox
//!   source-subdir: .            # optional
//!   source-commit: v1.0
//! after:
//!   source: https://git.launchpad.net/plainbox-provider-checkbox
//!   source-commit: master
//! additional-providers:         # optional
//!   - plainbox-provider-resource:
//!       source: https://git.launchpad.net/plainbox-provider-resource
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DiffError, Result};

/// One compared side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProviderSource {
    /// URL handed to `git clone`.
    pub source: String,
    /// Directory holding `manage.py` inside the repository.
    #[serde(default)]
    pub source_subdir: Option<String>,
    /// Revision handed to `git checkout`.
    pub source_commit: String,
}

/// A provider installed on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdditionalProvider {
    pub source: String,
    #[serde(default)]
    pub source_subdir: Option<String>,
    #[serde(default)]
    pub source_commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComparisonConfig {
    pub before: ProviderSource,
    pub after: ProviderSource,
    /// Each entry maps a directory name to its source.
    #[serde(default, alias = "additional_providers")]
    pub additional_providers: Vec<std::collections::BTreeMap<String, AdditionalProvider>>,
}

impl ComparisonConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, failing with `ConfigNotFound` when it is not a file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DiffError::ConfigNotFound(path.to_path_buf()));
        }
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Additional providers in declaration order.
    pub fn additional(&self) -> impl Iterator<Item = (&str, &AdditionalProvider)> {
        self.additional_providers
            .iter()
            .flat_map(|entry| entry.iter().map(|(name, p)| (name.as_str(), p)))
    }

    fn validate(&self) -> Result<()> {
        for (name, _) in self.additional() {
            if matches!(name, "before" | "after" | "checkbox-project")
                || name.is_empty()
                || name.contains('/')
            {
                return Err(DiffError::InvalidConfig(format!(
                    "additional provider name '{name}' cannot be used as a directory name"
                )));
            }
        }
        Ok(())
    }
}

/// `<repo>/<source-subdir>` with a missing subdir meaning the repo root.
pub fn subdir(repo: &Path, source_subdir: Option<&str>) -> std::path::PathBuf {
    match source_subdir {
        Some(dir) if !dir.is_empty() && dir != "." => repo.join(dir),
        _ => repo.to_path_buf(),
    }
}
