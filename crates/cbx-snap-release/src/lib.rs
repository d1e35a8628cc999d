//! Release tool for the Checkbox content snaps.
//!
//! A normal run clones the packaging repository and every part listed in
//! its `snap/snapcraft.yaml`, tags the parts that changed since their last
//! `snap-*` tag, pins the chosen tags in the manifest, bumps the version and
//! pushes the result to the release branch. `Mode::Finish` closes a release
//! and `Mode::Rebase` refreshes the release branch from another branch.

pub mod bump;
pub mod changelog;
pub mod error;
pub mod manifest;
pub mod options;
pub mod release;
pub mod tagging;

pub use bump::{bump_version, parse_bump_output};
pub use changelog::Changelog;
pub use error::{ReleaseError, Result};
pub use manifest::{parts_from_yaml, Manifest, Part, MANIFEST_PATH};
pub use options::{Mode, PartLists, ReleaseOptions, DEFAULT_IGNORE, DEFAULT_NO_TAG};
pub use release::{PartTag, Release, ReleaseReport};
pub use tagging::{decide_tag, parse_describe, Described, ReleaseTag, TagDecision};
