//! What one release run does and to which repositories.

use std::path::{Path, PathBuf};

use cbx_core::repo_basename;
use url::Url;

use crate::error::{ReleaseError, Result};

pub const LAUNCHPAD_HOST: &str = "git.launchpad.net";

/// Parts whose tags come from upstream; they are never tagged by the release.
pub const DEFAULT_NO_TAG: &[&str] = &["acpi-tools", "fwts", "stress-ng"];

/// Parts left untouched by the release.
pub const DEFAULT_IGNORE: &[&str] = &[
    "plainbox-provider-engineering-tests",
    "tpm2-tss",
    "tpm2-tools-3",
    "librealsense",
];

/// The three things a run can do to the packaging repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Tag changed parts, bump the version and push to the release branch.
    Normal,
    /// Rebase the branch onto `origin/<onto>` and force-push it.
    Rebase { onto: String },
    /// Tag `v<version>`, clear part tags and open the next dev version.
    Finish,
}

/// Exempt and ignored part names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLists {
    pub no_tag: Vec<String>,
    pub ignore: Vec<String>,
}

impl Default for PartLists {
    fn default() -> Self {
        Self {
            no_tag: DEFAULT_NO_TAG.iter().map(|s| s.to_string()).collect(),
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PartLists {
    pub fn is_exempt(&self, part: &str) -> bool {
        self.no_tag.iter().any(|p| p == part)
    }

    pub fn is_ignored(&self, part: &str) -> bool {
        self.ignore.iter().any(|p| p == part)
    }
}

#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Launchpad path of the packaging repository, e.g. `~user/+git/snap`.
    pub repository: String,
    pub release_branch: String,
    pub branch: String,
    pub mode: Mode,
    pub dry_run: bool,
    /// bumpversion segment for a normal release.
    pub increment_part: String,
    /// Launchpad user pushes are made as.
    pub user: Option<String>,
    /// Write the changelog against the previous `v*` release.
    pub changelog: bool,
    pub parts: PartLists,
    /// Scratch directory every repository is cloned into. Wiped per run.
    pub workdir: PathBuf,
    pub changelog_path: PathBuf,
}

impl ReleaseOptions {
    pub fn new(repository: impl Into<String>, release_branch: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            release_branch: release_branch.into(),
            branch: "master".to_string(),
            mode: Mode::Normal,
            dry_run: false,
            increment_part: "release".to_string(),
            user: None,
            changelog: true,
            parts: PartLists::default(),
            workdir: PathBuf::from("src"),
            changelog_path: PathBuf::from("changelog"),
        }
    }

    fn host(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{LAUNCHPAD_HOST}"),
            None => LAUNCHPAD_HOST.to_string(),
        }
    }

    /// `git+ssh://[<user>@]git.launchpad.net/<repository>`.
    pub fn repo_url(&self) -> String {
        format!(
            "git+ssh://{}/{}",
            self.host(),
            self.repository.trim_start_matches('/')
        )
    }

    pub fn snap_name(&self) -> String {
        repo_basename(&self.repository)
    }

    pub fn clone_dir(&self) -> PathBuf {
        self.workdir.join(self.snap_name())
    }

    /// Where tags of a part cloned from `source` are pushed: same path,
    /// over `git+ssh` on the Launchpad host.
    pub fn push_url(&self, source: &str) -> Result<String> {
        rewrite_remote(source, &self.host())
    }

    pub fn part_dir(&self, source: &str) -> PathBuf {
        part_dir(&self.workdir, source)
    }
}

/// Checkout directory of a part cloned into `workdir`.
pub fn part_dir(workdir: &Path, source: &str) -> PathBuf {
    workdir.join(repo_basename(source))
}

fn rewrite_remote(source: &str, host: &str) -> Result<String> {
    let parsed = Url::parse(source).map_err(|source_err| ReleaseError::Url {
        url: source.to_string(),
        source: source_err,
    })?;

    // `set_scheme` refuses to turn a special scheme into `git+ssh`, so the URL
    // is rebuilt from its parts.
    let mut rewritten = format!("git+ssh://{host}");
    if !parsed.path().starts_with('/') {
        rewritten.push('/');
    }
    rewritten.push_str(parsed.path());
    if let Some(query) = parsed.query() {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        rewritten.push('#');
        rewritten.push_str(fragment);
    }

    Url::parse(&rewritten)
        .map(String::from)
        .map_err(|source_err| ReleaseError::Url {
            url: rewritten,
            source: source_err,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_url_and_snap_name() {
        let mut options = ReleaseOptions::new("~checkbox-dev/checkbox/+git/checkbox-snappy", "release");
        assert_eq!(
            options.repo_url(),
            "git+ssh://git.launchpad.net/~checkbox-dev/checkbox/+git/checkbox-snappy"
        );
        options.user = Some("alice".to_string());
        assert_eq!(
            options.repo_url(),
            "git+ssh://alice@git.launchpad.net/~checkbox-dev/checkbox/+git/checkbox-snappy"
        );
        assert_eq!(options.snap_name(), "checkbox-snappy");
        assert_eq!(options.clone_dir(), PathBuf::from("src/checkbox-snappy"));
    }

    #[test]
    fn test_push_url_keeps_path() {
        let mut options = ReleaseOptions::new("snap", "release");
        options.user = Some("alice".to_string());
        assert_eq!(
            options
                .push_url("https://git.launchpad.net/plainbox-provider-resource")
                .unwrap(),
            "git+ssh://alice@git.launchpad.net/plainbox-provider-resource"
        );
        assert_eq!(
            options
                .push_url("git://git.launchpad.net/~checkbox-dev/+git/checkbox-support.git")
                .unwrap(),
            "git+ssh://alice@git.launchpad.net/~checkbox-dev/+git/checkbox-support.git"
        );
    }

    #[test]
    fn test_push_url_without_user() {
        let options = ReleaseOptions::new("snap", "release");
        assert_eq!(
            options.push_url("https://github.com/canonical/checkbox").unwrap(),
            "git+ssh://git.launchpad.net/canonical/checkbox"
        );
    }

    #[test]
    fn test_push_url_rejects_relative_source() {
        let options = ReleaseOptions::new("snap", "release");
        let err = options.push_url("../local-part").unwrap_err();
        assert!(matches!(err, ReleaseError::Url { .. }));
    }

    #[test]
    fn test_default_part_lists() {
        let lists = PartLists::default();
        assert!(lists.is_exempt("fwts"));
        assert!(!lists.is_exempt("checkbox-ng"));
        assert!(lists.is_ignored("tpm2-tss"));
        assert!(!lists.is_ignored("fwts"));
    }

    #[test]
    fn test_part_dir_strips_git_suffix() {
        assert_eq!(
            part_dir(Path::new("src"), "https://git.launchpad.net/checkbox-support.git"),
            PathBuf::from("src/checkbox-support")
        );
    }
}
