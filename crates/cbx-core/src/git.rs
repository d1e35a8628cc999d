//! Git operations expressed as [`Invocation`]s.
//!
//! All commands go through a [`ProcessRunner`] and fail with
//! [`CoreError::CommandFailed`] on a non-zero exit.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::process::{Invocation, ProcessRunner};

/// Directory name `git clone <url>` creates: the last path segment of the
/// URL without a trailing `.git`.
pub fn repo_basename(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Options for `git describe`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeOptions {
    /// `--abbrev=<n>`.
    pub abbrev: Option<u32>,
    /// `--match <pattern>`.
    pub pattern: Option<String>,
}

/// Thin wrapper that builds git invocations and runs them.
pub struct Git<'a> {
    runner: &'a dyn ProcessRunner,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self { runner }
    }

    fn git(dir: &Path) -> Invocation {
        Invocation::new("git").current_dir(dir)
    }

    /// `git clone <url> [<target>] [-b <branch>]` inside `parent`. Returns the
    /// path of the new checkout.
    pub async fn clone(
        &self,
        url: &str,
        parent: &Path,
        target: Option<&str>,
        branch: Option<&str>,
    ) -> Result<PathBuf> {
        let mut inv = Self::git(parent).args(["clone", url]);
        if let Some(target) = target {
            inv = inv.arg(target);
        }
        if let Some(branch) = branch {
            inv = inv.args(["-b", branch]);
        }
        self.runner.run_checked(&inv).await?;
        let dir = parent.join(target.map(str::to_string).unwrap_or_else(|| repo_basename(url)));
        if !dir.exists() {
            return Err(CoreError::Git(format!("Unable to clone {url}")));
        }
        Ok(dir)
    }

    pub async fn checkout(&self, repo: &Path, revision: &str) -> Result<()> {
        self.runner
            .run_checked(&Self::git(repo).args(["checkout", revision]))
            .await?;
        Ok(())
    }

    /// `git describe --tags`, returning the raw output with the trailing
    /// newline removed.
    pub async fn describe(&self, repo: &Path, options: &DescribeOptions) -> Result<String> {
        let mut inv = Self::git(repo).arg("describe");
        if let Some(abbrev) = options.abbrev {
            inv = inv.arg(format!("--abbrev={abbrev}"));
        }
        inv = inv.arg("--tags");
        if let Some(pattern) = &options.pattern {
            inv = inv.args(["--match", pattern.as_str()]);
        }
        let out = self.runner.run_checked(&inv).await?;
        Ok(out.stdout.trim_end().to_string())
    }

    /// Annotated tag whose message is its own name.
    pub async fn tag_annotated(&self, repo: &Path, name: &str) -> Result<()> {
        self.runner
            .run_checked(&Self::git(repo).args(["tag", name, "-m", name]))
            .await?;
        Ok(())
    }

    /// `git push [--dry-run] <remote> --tags`.
    pub async fn push_tags(&self, repo: &Path, remote: &str, dry_run: bool) -> Result<()> {
        let mut inv = Self::git(repo).arg("push");
        if dry_run {
            inv = inv.arg("--dry-run");
        }
        inv = inv.args([remote, "--tags"]);
        self.runner.run_checked(&inv).await?;
        Ok(())
    }

    /// `git push [--dry-run] [-f] <remote> <refspec> [--tags]`.
    pub async fn push_refspec(
        &self,
        repo: &Path,
        remote: &str,
        refspec: &str,
        force: bool,
        tags: bool,
        dry_run: bool,
    ) -> Result<()> {
        let mut inv = Self::git(repo).arg("push");
        if dry_run {
            inv = inv.arg("--dry-run");
        }
        if force {
            inv = inv.arg("-f");
        }
        inv = inv.args([remote, refspec]);
        if tags {
            inv = inv.arg("--tags");
        }
        self.runner.run_checked(&inv).await?;
        Ok(())
    }

    /// One `+ <subject>` line per non-merge commit in `old...new`.
    pub async fn log_subjects(&self, repo: &Path, old: &str, new: &str) -> Result<String> {
        let out = self
            .runner
            .run_checked(&Self::git(repo).args([
                "log".to_string(),
                "--no-merges".to_string(),
                "--pretty=format:+ %s".to_string(),
                format!("{old}...{new}"),
            ]))
            .await?;
        Ok(out.stdout)
    }

    /// Contents of `path` at `revision`.
    pub async fn show_file(&self, repo: &Path, revision: &str, path: &str) -> Result<String> {
        let out = self
            .runner
            .run_checked(&Self::git(repo).args([
                "--no-pager".to_string(),
                "show".to_string(),
                format!("{revision}:{path}"),
            ]))
            .await?;
        Ok(out.stdout)
    }

    pub async fn add_all(&self, repo: &Path) -> Result<()> {
        self.runner
            .run_checked(&Self::git(repo).args(["add", "--all"]))
            .await?;
        Ok(())
    }

    pub async fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.runner
            .run_checked(&Self::git(repo).args(["commit", "-m", message]))
            .await?;
        Ok(())
    }

    pub async fn rebase(&self, repo: &Path, upstream: &str) -> Result<()> {
        self.runner
            .run_checked(&Self::git(repo).args(["rebase", upstream]))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeRunner;
    use crate::process::ProcessOutput;
    use crate::system::SystemRunner;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[test]
    fn test_repo_basename() {
        assert_eq!(repo_basename("https://git.launchpad.net/checkbox"), "checkbox");
        assert_eq!(
            repo_basename("https://github.com/ColinIanKing/fwts.git"),
            "fwts"
        );
        assert_eq!(repo_basename("git@github.com:foo/stress-ng.git"), "stress-ng");
        assert_eq!(repo_basename("lp:checkbox-support"), "checkbox-support");
        assert_eq!(repo_basename("https://git.launchpad.net/checkbox/"), "checkbox");
    }

    #[tokio::test]
    async fn test_describe_builds_expected_arguments() {
        let runner = FakeRunner::new();
        runner.on(
            "git describe",
            ProcessOutput::success("snap-2020-01-01T1200\n"),
        );
        let git = Git::new(&runner);
        let tag = git
            .describe(
                Path::new("/src/fwts"),
                &DescribeOptions {
                    abbrev: Some(40),
                    pattern: Some("snap-*T*".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(tag, "snap-2020-01-01T1200");
        assert_eq!(
            runner.command_lines(),
            vec!["git describe --abbrev=40 --tags --match snap-*T*".to_string()]
        );
    }

    #[tokio::test]
    async fn test_clone_reports_missing_checkout() {
        let runner = FakeRunner::new();
        let parent = tempfile::tempdir().unwrap();
        let git = Git::new(&runner);
        let err = git
            .clone("https://git.launchpad.net/checkbox", parent.path(), None, Some("master"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unable to clone"));
        assert_eq!(
            runner.command_lines(),
            vec!["git clone https://git.launchpad.net/checkbox -b master".to_string()]
        );
    }

    #[tokio::test]
    async fn test_push_refspec_flags_order() {
        let runner = FakeRunner::new();
        let git = Git::new(&runner);
        git.push_refspec(Path::new("/src/snap"), "origin", "master:release", true, true, true)
            .await
            .unwrap();
        assert_eq!(
            runner.command_lines(),
            vec!["git push --dry-run -f origin master:release --tags".to_string()]
        );
    }

    #[tokio::test]
    async fn test_describe_real_repo_without_new_commits() {
        let repo = make_git_repo();
        run_git(repo.path(), &["tag", "snap-2020-01-01T1200", "-m", "snap-2020-01-01T1200"]);
        let git = Git::new(&SystemRunner);
        let options = DescribeOptions {
            abbrev: Some(40),
            pattern: Some("snap-*T*".to_string()),
        };

        let first = git.describe(repo.path(), &options).await.unwrap();
        let second = git.describe(repo.path(), &options).await.unwrap();
        assert_eq!(first, "snap-2020-01-01T1200");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_describe_real_repo_with_new_commit_has_suffix() {
        let repo = make_git_repo();
        run_git(repo.path(), &["tag", "snap-2020-01-01T1200", "-m", "snap-2020-01-01T1200"]);
        run_git(repo.path(), &["commit", "--allow-empty", "-m", "fix things"]);
        let git = Git::new(&SystemRunner);

        let out = git
            .describe(
                repo.path(),
                &DescribeOptions {
                    abbrev: Some(40),
                    pattern: None,
                },
            )
            .await
            .unwrap();
        assert!(out.starts_with("snap-2020-01-01T1200-1-g"));
        assert_eq!(out.len(), "snap-2020-01-01T1200-1-g".len() + 40);

        let log = git
            .log_subjects(repo.path(), "snap-2020-01-01T1200", "HEAD")
            .await
            .unwrap();
        assert_eq!(log, "+ fix things");
    }
}
