//! Working directory with both provider checkouts and their venvs.
//!
//! Layout:
//!
//! ```text
//! <root>/before/            clone of `before.source`
//! <root>/after/             clone of `after.source`
//! <root>/<name>/            one clone per additional provider
//! <root>/checkbox-project/  produced by the bootstrap script
//!     venv-before/
//!     venv-after/
//! ```

use std::fmt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use cbx_core::{Git, Invocation, OutputMode, ProcessRunner, Venv};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{subdir, ComparisonConfig, ProviderSource};
use crate::error::Result;

/// Directory the bootstrap script creates.
pub const PROJECT_DIR: &str = "checkbox-project";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Before,
    After,
}

impl Side {
    pub fn name(&self) -> &'static str {
        match self {
            Side::Before => "before",
            Side::After => "after",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How to build the workspace.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Directory the temporary working directory is created in.
    pub parent_dir: PathBuf,
    /// Script producing `checkbox-project`, run inside the working directory.
    pub bootstrap_script: PathBuf,
    /// Remove the working directory when the workspace is dropped.
    pub cleanup: bool,
}

enum Root {
    Kept(PathBuf),
    Temporary(tempfile::TempDir),
}

impl Root {
    fn path(&self) -> &Path {
        match self {
            Root::Kept(path) => path,
            Root::Temporary(dir) => dir.path(),
        }
    }
}

/// Both sides checked out and installed into their own venv.
pub struct Workspace {
    root: Root,
    project_dir: PathBuf,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root())
            .field("project_dir", &self.project_dir)
            .finish()
    }
}

impl Workspace {
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn venv(&self, side: Side) -> Venv {
        Venv::new(self.project_dir.join(format!("venv-{}", side.name())))
    }

    /// Clone, check out, bootstrap and install everything `config` names.
    /// Any failing step aborts the setup.
    pub async fn setup(
        runner: &dyn ProcessRunner,
        config: &ComparisonConfig,
        options: &SetupOptions,
    ) -> Result<Self> {
        let tmp = tempfile::Builder::new()
            .prefix("provider-diff-")
            .tempdir_in(&options.parent_dir)?;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o755))?;
        let root = if options.cleanup {
            Root::Temporary(tmp)
        } else {
            Root::Kept(tmp.into_path())
        };
        let dir = root.path().to_path_buf();
        info!("Using {} as the working directory", dir.display());

        let git = Git::new(runner);
        let before = checkout_side(&git, &dir, Side::Before, &config.before).await?;
        let after = checkout_side(&git, &dir, Side::After, &config.after).await?;
        let mut installers_before = vec![before.join("manage.py")];
        let mut installers_after = vec![after.join("manage.py")];

        info!("Bootstrapping checkbox with {}", options.bootstrap_script.display());
        runner
            .run_checked(
                &Invocation::new(options.bootstrap_script.to_string_lossy())
                    .current_dir(&dir)
                    .output(OutputMode::Capture),
            )
            .await?;

        for (name, provider) in config.additional() {
            let repo = git.clone(&provider.source, &dir, Some(name), None).await?;
            let provider_dir = subdir(&repo, provider.source_subdir.as_deref());
            if let Some(commit) = &provider.source_commit {
                git.checkout(&provider_dir, commit).await?;
            }
            let manage_py = provider_dir.join("manage.py");
            installers_before.push(manage_py.clone());
            installers_after.push(manage_py);
        }

        let project_dir = dir.join(PROJECT_DIR);
        let workspace = Self { root, project_dir };
        workspace.install(runner, Side::Before, &installers_before).await?;
        workspace.install(runner, Side::After, &installers_after).await?;
        Ok(workspace)
    }

    async fn install(
        &self,
        runner: &dyn ProcessRunner,
        side: Side,
        installers: &[PathBuf],
    ) -> Result<()> {
        let venv = Venv::create(
            runner,
            &self.project_dir,
            self.venv(side).root(),
            OutputMode::Capture,
        )
        .await?;
        for manage_py in installers {
            venv.develop_provider(runner, manage_py, &self.project_dir).await?;
        }
        Ok(())
    }
}

async fn checkout_side(
    git: &Git<'_>,
    dir: &Path,
    side: Side,
    source: &ProviderSource,
) -> Result<PathBuf> {
    let repo = git.clone(&source.source, dir, Some(side.name()), None).await?;
    let provider_dir = subdir(&repo, source.source_subdir.as_deref());
    git.checkout(&provider_dir, &source.source_commit).await?;
    Ok(provider_dir)
}
