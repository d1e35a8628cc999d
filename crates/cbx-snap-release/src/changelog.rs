//! The `changelog` file written next to the run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const HEADER: &str = "Changelog\n";

#[derive(Debug)]
pub struct Changelog {
    path: PathBuf,
}

impl Changelog {
    /// Truncate `path` and write the header.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = File::create(&path)?;
        file.write_all(HEADER.as_bytes())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the log of one part. Empty logs leave the file untouched.
    pub fn append_part(&self, part: &str, log: &str) -> Result<bool> {
        if log.is_empty() {
            return Ok(false);
        }
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        write!(file, "\n{part}:\n{log}\n")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_follow_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changelog");
        std::fs::write(&path, "stale content").unwrap();

        let changelog = Changelog::create(&path).unwrap();
        assert!(changelog.append_part("checkbox-ng", "+ Fix launcher parsing\n+ Add jobs").unwrap());
        assert!(!changelog.append_part("checkbox-support", "").unwrap());

        assert_eq!(
            std::fs::read_to_string(changelog.path()).unwrap(),
            "Changelog\n\ncheckbox-ng:\n+ Fix launcher parsing\n+ Add jobs\n"
        );
    }
}
