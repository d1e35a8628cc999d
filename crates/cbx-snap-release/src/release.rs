//! The release run: clone, tag, rewrite, bump, commit and push.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cbx_core::{repo_basename, DescribeOptions, Git, ProcessRunner};
use tracing::{debug, info};

use crate::bump::bump_version;
use crate::changelog::Changelog;
use crate::error::Result;
use crate::manifest::{parts_from_yaml, Manifest, Part, MANIFEST_PATH};
use crate::options::{Mode, ReleaseOptions};
use crate::tagging::{decide_tag, ReleaseTag, TagDecision, SNAP_TAG_PATTERN};

pub const RELEASE_COMMIT_MESSAGE: &str = "Bump version number and tag parts";
pub const FINISH_COMMIT_MESSAGE: &str = "Bump version to next dev release";

fn banner(title: &str) {
    let rule = "#".repeat(80);
    info!("{rule}");
    info!("# {title}");
    info!("{rule}");
}

/// Tag chosen for one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTag {
    pub part: String,
    pub decision: TagDecision,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub parts: Vec<PartTag>,
    /// `v<version>` tag created when finishing a release.
    pub release_tag: Option<String>,
    /// Version written by bumpversion.
    pub new_version: Option<String>,
    /// `git push --delete` commands undoing the pushed part tags.
    pub cleanup_commands: Vec<String>,
}

pub struct Release<'a> {
    runner: &'a dyn ProcessRunner,
    git: Git<'a>,
    options: ReleaseOptions,
    new_tag: ReleaseTag,
}

impl<'a> Release<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, options: ReleaseOptions, new_tag: ReleaseTag) -> Self {
        Self {
            runner,
            git: Git::new(runner),
            options,
            new_tag,
        }
    }

    pub fn options(&self) -> &ReleaseOptions {
        &self.options
    }

    pub fn new_tag(&self) -> &ReleaseTag {
        &self.new_tag
    }

    pub async fn run(&self) -> Result<ReleaseReport> {
        self.reset_workdir()?;
        match &self.options.mode {
            Mode::Rebase { onto } => self.rebase(onto).await,
            Mode::Finish => self.finish().await,
            Mode::Normal => self.release().await,
        }
    }

    fn reset_workdir(&self) -> Result<()> {
        let workdir = &self.options.workdir;
        match std::fs::remove_dir_all(workdir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(workdir)?;
        Ok(())
    }

    async fn clone(&self, url: &str, branch: Option<&str>) -> Result<PathBuf> {
        let name = repo_basename(url);
        match branch {
            Some(branch) => banner(&format!("Cloning {name} ({branch})")),
            None => banner(&format!("Cloning {name}")),
        }
        Ok(self.git.clone(url, &self.options.workdir, None, branch).await?)
    }

    async fn rebase(&self, onto: &str) -> Result<ReleaseReport> {
        let clone_dir = self
            .clone(&self.options.repo_url(), Some(&self.options.branch))
            .await?;
        self.git.rebase(&clone_dir, &format!("origin/{onto}")).await?;
        self.push_release_branch(&clone_dir, &self.options.branch, true)
            .await?;
        Ok(ReleaseReport::default())
    }

    async fn finish(&self) -> Result<ReleaseReport> {
        let clone_dir = self
            .clone(&self.options.repo_url(), Some(&self.options.release_branch))
            .await?;
        let mut manifest = Manifest::load(clone_dir.join(MANIFEST_PATH))?;

        let release_tag = format!("v{}", manifest.version()?);
        self.git.tag_annotated(&clone_dir, &release_tag).await?;
        info!("{release_tag} applied on {}", self.options.snap_name());

        banner(&format!("Updating parts in {}", manifest.path().display()));
        let names: Vec<String> = manifest
            .parts()
            .iter()
            .map(|p| p.name.clone())
            .filter(|name| !self.options.parts.is_ignored(name))
            .collect();
        for name in &names {
            manifest.set_source_tag(name, "")?;
        }
        manifest.save()?;

        let new_version = self
            .bump_and_commit(&clone_dir, &manifest, "minor", FINISH_COMMIT_MESSAGE)
            .await?;
        self.push_release_branch(&clone_dir, &self.options.release_branch, false)
            .await?;

        Ok(ReleaseReport {
            release_tag: Some(release_tag),
            new_version: Some(new_version),
            ..ReleaseReport::default()
        })
    }

    async fn release(&self) -> Result<ReleaseReport> {
        let clone_dir = self
            .clone(&self.options.repo_url(), Some(&self.options.branch))
            .await?;
        let previous = if self.options.changelog {
            self.previous_tags(&clone_dir).await?
        } else {
            BTreeMap::new()
        };
        let mut manifest = Manifest::load(clone_dir.join(MANIFEST_PATH))?;
        let changelog = if self.options.changelog {
            Some(Changelog::create(&self.options.changelog_path)?)
        } else {
            None
        };

        let mut parts: Vec<Part> = manifest.parts().to_vec();
        parts.sort_by_key(|p| self.options.parts.is_exempt(&p.name));

        let mut report = ReleaseReport::default();
        for part in parts {
            if self.options.parts.is_ignored(&part.name) {
                debug!("Skipping ignored part {}", part.name);
                continue;
            }
            let part_dir = self.clone(&part.source, None).await?;
            let decision = self.tag_part(&part, &part_dir).await?;
            manifest.set_source_tag(&part.name, decision.tag())?;

            if decision.creates_tag() {
                report
                    .cleanup_commands
                    .push(format!("git push --delete {} {}", part.source, self.new_tag));
            }
            if let (Some(changelog), Some(old_tag)) = (&changelog, previous.get(&part.name)) {
                let log = self.git.log_subjects(&part_dir, old_tag, decision.tag()).await?;
                changelog.append_part(&part.name, &log)?;
            }
            report.parts.push(PartTag {
                part: part.name,
                decision,
            });
        }

        banner(&format!("Updating parts in {}", manifest.path().display()));
        manifest.save()?;
        let new_version = self
            .bump_and_commit(
                &clone_dir,
                &manifest,
                &self.options.increment_part,
                RELEASE_COMMIT_MESSAGE,
            )
            .await?;
        report.new_version = Some(new_version);

        if !report.cleanup_commands.is_empty() {
            let rule = "#".repeat(80);
            debug!("{rule}");
            debug!("# Release tag(s) cleanup command(s):");
            debug!("{rule}");
            for command in &report.cleanup_commands {
                debug!("{command}");
            }
        }

        self.push_release_branch(&clone_dir, &self.options.branch, false)
            .await?;
        Ok(report)
    }

    /// `source-tag` of every part in the manifest of the last `v*` release.
    async fn previous_tags(&self, clone_dir: &Path) -> Result<BTreeMap<String, String>> {
        let last_release = self
            .git
            .describe(
                clone_dir,
                &DescribeOptions {
                    abbrev: Some(0),
                    pattern: Some("v*".to_string()),
                },
            )
            .await?;
        info!("Last release tag: {last_release}");
        let text = self
            .git
            .show_file(clone_dir, &last_release, MANIFEST_PATH)
            .await?;
        Ok(parts_from_yaml(&text)?
            .into_iter()
            .map(|p| (p.name, p.source_tag))
            .collect())
    }

    async fn tag_part(&self, part: &Part, part_dir: &Path) -> Result<TagDecision> {
        let exempt = self.options.parts.is_exempt(&part.name);
        let describe = DescribeOptions {
            abbrev: Some(40),
            pattern: (!exempt).then(|| SNAP_TAG_PATTERN.to_string()),
        };
        let output = self.git.describe(part_dir, &describe).await?;
        let decision = decide_tag(&part.name, &output, exempt, &self.new_tag)?;

        match &decision {
            TagDecision::Create(tag) => {
                info!("Tag required on {}", part.name);
                let push_url = self.options.push_url(&part.source)?;
                self.git.tag_annotated(part_dir, tag).await?;
                info!("{tag} applied on {}", repo_basename(&part.source));
                info!("URL target is {push_url}");
                if !self.options.dry_run {
                    info!("Pushing changes to origin");
                }
                self.git
                    .push_tags(part_dir, &push_url, self.options.dry_run)
                    .await?;
            }
            TagDecision::Reuse(tag) | TagDecision::Verbatim(tag) => {
                if !exempt {
                    info!("No new changes on {}", part.name);
                }
                info!("{tag} will be used");
            }
        }
        Ok(decision)
    }

    async fn bump_and_commit(
        &self,
        clone_dir: &Path,
        manifest: &Manifest,
        segment: &str,
        message: &str,
    ) -> Result<String> {
        let snap = self.options.snap_name();
        banner(&format!(
            "Updating {snap} version in {}",
            manifest.path().display()
        ));
        let version = bump_version(self.runner, clone_dir, segment).await?;
        info!("Bump {snap} to version {version}");
        self.git.add_all(clone_dir).await?;
        self.git.commit(clone_dir, message).await?;
        Ok(version)
    }

    /// Push `<local_branch>:<release_branch>`, then the same with `--tags`.
    async fn push_release_branch(&self, clone_dir: &Path, local_branch: &str, force: bool) -> Result<()> {
        let remote = self.options.repo_url();
        let refspec = format!("{local_branch}:{}", self.options.release_branch);
        for tags in [false, true] {
            self.git
                .push_refspec(clone_dir, &remote, &refspec, force, tags, self.options.dry_run)
                .await?;
        }
        Ok(())
    }
}
