//! Release tag naming and the per-part tag decision.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{ReleaseError, Result};

/// `--match` pattern selecting release tags.
pub const SNAP_TAG_PATTERN: &str = "snap-*T*";

/// `snap-YYYY-MM-DDTHHMM`, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self(time.format("snap-%Y-%m-%dT%H%M").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `git describe --abbrev=40` output split into the tag and the
/// `-<n>-g<sha>` suffix present when commits follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Described {
    pub tag: String,
    pub additional_commits: Option<String>,
}

fn describe_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<tag>.+?)(?P<additional_commits>-[0-9]+-g.{40})?$")
            .unwrap_or_else(|e| unreachable!("invalid describe pattern: {e}"))
    })
}

pub fn parse_describe(output: &str) -> Option<Described> {
    let caps = describe_regex().captures(output.trim())?;
    Some(Described {
        tag: caps.name("tag")?.as_str().to_string(),
        additional_commits: caps.name("additional_commits").map(|m| m.as_str().to_string()),
    })
}

/// What happens to a part's `source-tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagDecision {
    /// Nothing new since the last tag.
    Reuse(String),
    /// New commits on a taggable part: apply the release tag.
    Create(String),
    /// New commits on an exempt part: pin the describe output itself.
    Verbatim(String),
}

impl TagDecision {
    pub fn tag(&self) -> &str {
        match self {
            TagDecision::Reuse(tag) | TagDecision::Create(tag) | TagDecision::Verbatim(tag) => tag,
        }
    }

    pub fn creates_tag(&self) -> bool {
        matches!(self, TagDecision::Create(_))
    }
}

/// Decide the tag of `part` from its `git describe` output.
pub fn decide_tag(
    part: &str,
    describe_output: &str,
    exempt: bool,
    new_tag: &ReleaseTag,
) -> Result<TagDecision> {
    let described = parse_describe(describe_output).ok_or_else(|| ReleaseError::NoTagFound {
        part: part.to_string(),
    })?;
    Ok(match (described.additional_commits, exempt) {
        (None, _) => TagDecision::Reuse(described.tag),
        (Some(_), false) => TagDecision::Create(new_tag.to_string()),
        (Some(_), true) => TagDecision::Verbatim(describe_output.trim().to_string()),
    })
}
