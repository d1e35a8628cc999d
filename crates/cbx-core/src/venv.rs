//! Checkbox virtual environments.
//!
//! `mk-venv` (shipped in the checkbox tree) creates a Python venv whose
//! `activate` script exports `PROVIDERPATH`. Instead of sourcing that script
//! through a shell, commands get the equivalent environment overlay.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::process::{Invocation, OutputMode, ProcessRunner};

/// Where `mk-venv` points `PROVIDERPATH`, relative to the venv root.
pub const PROVIDER_SUBDIR: &str = "share/plainbox-providers-1";

/// A venv created by `mk-venv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venv {
    root: PathBuf,
}

impl Venv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn provider_path(&self) -> PathBuf {
        self.root.join(PROVIDER_SUBDIR)
    }

    /// Environment an activated venv would have.
    pub fn activation_env(&self) -> Vec<(String, OsString)> {
        let mut paths = vec![self.bin_dir()];
        if let Some(current) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&current));
        }
        let path = std::env::join_paths(paths).unwrap_or_else(|_| self.bin_dir().into_os_string());
        vec![
            ("VIRTUAL_ENV".to_string(), self.root.clone().into_os_string()),
            ("PATH".to_string(), path),
            ("PROVIDERPATH".to_string(), self.provider_path().into_os_string()),
        ]
    }

    /// `program` run inside this venv.
    pub fn command(&self, program: impl Into<String>) -> Invocation {
        Invocation::new(program).envs(self.activation_env())
    }

    /// Run `./mk-venv <root>` from the checkbox tree.
    pub async fn create(
        runner: &dyn ProcessRunner,
        checkbox_dir: &Path,
        root: impl Into<PathBuf>,
        output: OutputMode,
    ) -> Result<Self> {
        let venv = Self::new(root);
        info!("Creating venv in {}", venv.root.display());
        runner
            .run_checked(
                &Invocation::new("./mk-venv")
                    .arg(venv.root.to_string_lossy())
                    .current_dir(checkbox_dir)
                    .output(output),
            )
            .await?;
        Ok(venv)
    }

    /// `manage.py develop -d $PROVIDERPATH` for one provider.
    pub async fn develop_provider(
        &self,
        runner: &dyn ProcessRunner,
        manage_py: &Path,
        cwd: &Path,
    ) -> Result<()> {
        info!("Installing provider {}", manage_py.display());
        runner
            .run_checked(
                &self
                    .command(manage_py.to_string_lossy())
                    .args(["develop".to_string(), "-d".to_string()])
                    .arg(self.provider_path().to_string_lossy())
                    .current_dir(cwd),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeRunner;

    #[test]
    fn test_activation_env_prepends_bin() {
        let venv = Venv::new("/tmp/bench/venv");
        let env = venv.activation_env();

        let path = env
            .iter()
            .find(|(k, _)| k == "PATH")
            .map(|(_, v)| v.clone())
            .unwrap();
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, PathBuf::from("/tmp/bench/venv/bin"));

        let provider = env
            .iter()
            .find(|(k, _)| k == "PROVIDERPATH")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(
            PathBuf::from(provider),
            PathBuf::from("/tmp/bench/venv/share/plainbox-providers-1")
        );
    }

    #[tokio::test]
    async fn test_create_and_develop_invocations() {
        let runner = FakeRunner::new();
        let venv = Venv::create(
            &runner,
            Path::new("/checkbox-ng"),
            "/tmp/x/venv",
            OutputMode::Capture,
        )
        .await
        .unwrap();
        venv.develop_provider(&runner, Path::new("/bench/provider/manage.py"), Path::new("/tmp/x"))
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].command_line(), "./mk-venv /tmp/x/venv");
        assert_eq!(calls[0].cwd.as_deref(), Some(Path::new("/checkbox-ng")));
        assert_eq!(
            calls[1].command_line(),
            "/bench/provider/manage.py develop -d /tmp/x/venv/share/plainbox-providers-1"
        );
        assert!(calls[1].env.contains_key("VIRTUAL_ENV"));
    }
}
