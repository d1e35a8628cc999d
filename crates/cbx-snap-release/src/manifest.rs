//! `snap/snapcraft.yaml` reading and in-place `source-tag` updates.
//!
//! The manifest is parsed with `serde_yaml` to find the version and the
//! parts, but written back line by line: only the value of each changed
//! `source-tag:` line is replaced, so comments, key order and quoting of the
//! rest of the file stay exactly as the maintainers wrote them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{ReleaseError, Result};

/// Manifest location inside the packaging repository.
pub const MANIFEST_PATH: &str = "snap/snapcraft.yaml";

const SOURCE_TAG_KEY: &str = "source-tag";

/// A manifest part carrying both `source` and `source-tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub source: String,
    pub source_tag: String,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    parts: Option<Mapping>,
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn collect_parts(parts: Option<&Mapping>) -> Vec<Part> {
    let Some(parts) = parts else {
        return Vec::new();
    };
    parts
        .iter()
        .filter_map(|(name, body)| {
            let name = scalar(name)?;
            let body = body.as_mapping()?;
            let source = body.get("source").and_then(scalar)?;
            let source_tag = body.get(SOURCE_TAG_KEY).and_then(scalar)?;
            Some(Part {
                name,
                source,
                source_tag,
            })
        })
        .collect()
}

/// Parts of a manifest given as text, e.g. the one of a previous release.
pub fn parts_from_yaml(text: &str) -> Result<Vec<Part>> {
    let raw: RawManifest = serde_yaml::from_str(text)?;
    Ok(collect_parts(raw.parts.as_ref()))
}

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    text: String,
    version: Option<String>,
    parts: Vec<Part>,
    updates: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)?;
        Self::parse(path, text)
    }

    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let raw: RawManifest = serde_yaml::from_str(&text)?;
        Ok(Self {
            path: path.into(),
            version: raw.version.as_ref().and_then(scalar),
            parts: collect_parts(raw.parts.as_ref()),
            text,
            updates: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> Result<&str> {
        self.version
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ReleaseError::Manifest(format!("{} has no version", self.path.display())))
    }

    /// Parts in manifest order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Current tag of `name`, including pending updates.
    pub fn source_tag(&self, name: &str) -> Option<&str> {
        self.updates
            .get(name)
            .map(String::as_str)
            .or_else(|| self.part(name).map(|p| p.source_tag.as_str()))
    }

    pub fn set_source_tag(&mut self, name: &str, tag: impl Into<String>) -> Result<()> {
        if self.part(name).is_none() {
            return Err(ReleaseError::Manifest(format!("unknown part {name}")));
        }
        self.updates.insert(name.to_string(), tag.into());
        Ok(())
    }

    /// Manifest text with every pending update applied.
    pub fn render(&self) -> Result<String> {
        let mut lines: Vec<String> = self.text.split('\n').map(str::to_string).collect();
        let locations = locate_source_tags(&lines);
        for (name, tag) in &self.updates {
            let index = locations.get(name).copied().ok_or_else(|| {
                ReleaseError::Manifest(format!(
                    "cannot locate the {SOURCE_TAG_KEY} line of part {name}"
                ))
            })?;
            lines[index] = replace_value(&lines[index], tag);
        }
        Ok(lines.join("\n"))
    }

    pub fn save(&self) -> Result<()> {
        std::fs::write(&self.path, self.render()?)?;
        Ok(())
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Mapping key of a `key:` or `key: value` line.
fn key_of(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let (key, _) = trimmed.split_once(':')?;
    let key = key.trim();
    let key = key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
        .unwrap_or(key);
    Some(key.to_string())
}

/// Line index of each part's block-style `source-tag:` entry.
fn locate_source_tags(lines: &[String]) -> BTreeMap<String, usize> {
    let mut found = BTreeMap::new();
    let Some(start) = lines
        .iter()
        .position(|l| indent_of(l) == 0 && key_of(l).as_deref() == Some("parts"))
    else {
        return found;
    };

    let mut part_indent = None;
    let mut child_indent = None;
    let mut current: Option<String> = None;
    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        if !is_content(line) {
            continue;
        }
        let indent = indent_of(line);
        if indent == 0 {
            break;
        }
        let part_indent = *part_indent.get_or_insert(indent);
        if indent < part_indent {
            break;
        }
        if indent == part_indent {
            current = key_of(line);
            child_indent = None;
            continue;
        }
        let child = *child_indent.get_or_insert(indent);
        if indent == child && key_of(line).as_deref() == Some(SOURCE_TAG_KEY) {
            if let Some(part) = &current {
                found.insert(part.clone(), index);
            }
        }
    }
    found
}

/// `source-tag: <value>` with the value swapped for `tag`, keeping the
/// indentation, the quote style and any trailing comment.
fn replace_value(line: &str, tag: &str) -> String {
    let Some(colon) = line.find(':') else {
        return line.to_string();
    };
    let (head, rest) = line.split_at(colon + 1);
    let value = rest.trim_start();

    let (quote, tail) = match value.chars().next() {
        Some(q @ ('\'' | '"')) => {
            let close = value[1..].find(q).map(|i| i + 2).unwrap_or(value.len());
            (Some(q), &value[close..])
        }
        _ => {
            let end = value.find(" #").unwrap_or(value.len());
            (None, &value[end..])
        }
    };

    let rendered = match quote {
        Some(q) => format!("{q}{tag}{q}"),
        None if tag.is_empty() => "''".to_string(),
        None => tag.to_string(),
    };
    format!("{head} {rendered}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
name: checkbox-snappy
version: '2.4.0-dev'  # bumped by bumpversion
grade: stable

parts:
  # runtime providers
  checkbox-ng:
    plugin: python
    source: https://git.launchpad.net/checkbox-ng
    source-tag: 'snap-2024-01-10T0900'  # keep
  checkbox-support:
    source: https://git.launchpad.net/checkbox-support
    source-tag: \"v0.50\"
    organize:
      source-tag: not-a-part-key
  fwts:
    source: https://git.launchpad.net/fwts
    source-tag: V24.01.00
  launchers:
    plugin: dump
    source: launchers/
apps:
  checkbox-cli:
    command: bin/checkbox-cli
";

    fn manifest() -> Manifest {
        Manifest::parse("snap/snapcraft.yaml", MANIFEST).unwrap()
    }

    #[test]
    fn test_parts_need_source_and_tag() {
        let m = manifest();
        let names: Vec<_> = m.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["checkbox-ng", "checkbox-support", "fwts"]);
        assert_eq!(m.part("checkbox-support").unwrap().source_tag, "v0.50");
        assert_eq!(m.version().unwrap(), "2.4.0-dev");
    }

    #[test]
    fn test_numeric_version() {
        let m = Manifest::parse("x", "version: 1.5\nparts: {}\n").unwrap();
        assert_eq!(m.version().unwrap(), "1.5");
        assert!(m.parts().is_empty());
    }

    #[test]
    fn test_missing_version_is_an_error() {
        let m = Manifest::parse("x", "parts: {}\n").unwrap();
        assert!(matches!(m.version(), Err(ReleaseError::Manifest(_))));
    }

    #[test]
    fn test_render_without_updates_is_identical() {
        assert_eq!(manifest().render().unwrap(), MANIFEST);
    }

    #[test]
    fn test_render_preserves_quotes_and_comments() {
        let mut m = manifest();
        m.set_source_tag("checkbox-ng", "snap-2024-02-01T1200").unwrap();
        m.set_source_tag("checkbox-support", "snap-2024-02-01T1200").unwrap();
        m.set_source_tag("fwts", "V24.01.00-3-gabc").unwrap();
        let out = m.render().unwrap();

        assert!(out.contains("    source-tag: 'snap-2024-02-01T1200'  # keep\n"));
        assert!(out.contains("    source-tag: \"snap-2024-02-01T1200\"\n"));
        assert!(out.contains("    source-tag: V24.01.00-3-gabc\n"));
        assert!(out.contains("      source-tag: not-a-part-key\n"));
        assert!(out.contains("version: '2.4.0-dev'  # bumped by bumpversion\n"));

        let reparsed = Manifest::parse("x", out).unwrap();
        assert_eq!(reparsed.part("fwts").unwrap().source_tag, "V24.01.00-3-gabc");
    }

    #[test]
    fn test_blank_tag_is_quoted() {
        let mut m = manifest();
        m.set_source_tag("fwts", "").unwrap();
        let out = m.render().unwrap();
        assert!(out.contains("    source-tag: ''\n"));
        let reparsed = Manifest::parse("x", out).unwrap();
        assert_eq!(reparsed.part("fwts").unwrap().source_tag, "");
    }

    #[test]
    fn test_unknown_part_rejected() {
        let mut m = manifest();
        assert!(m.set_source_tag("launchers", "x").is_err());
        assert!(m.set_source_tag("nope", "x").is_err());
    }

    #[test]
    fn test_flow_style_part_cannot_be_rewritten() {
        let mut m = Manifest::parse(
            "x",
            "version: '1'\nparts:\n  a: {source: https://h/a, source-tag: t1}\n",
        )
        .unwrap();
        m.set_source_tag("a", "t2").unwrap();
        assert!(matches!(m.render(), Err(ReleaseError::Manifest(_))));
    }

    #[test]
    fn test_source_tag_sees_pending_update() {
        let mut m = manifest();
        m.set_source_tag("fwts", "new").unwrap();
        assert_eq!(m.source_tag("fwts"), Some("new"));
        assert_eq!(m.source_tag("checkbox-ng"), Some("snap-2024-01-10T0900"));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapcraft.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let mut m = Manifest::load(&path).unwrap();
        m.set_source_tag("checkbox-ng", "snap-2024-03-03T0303").unwrap();
        m.save().unwrap();

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(
            reloaded.part("checkbox-ng").unwrap().source_tag,
            "snap-2024-03-03T0303"
        );
    }

    #[test]
    fn test_parts_from_previous_release() {
        let parts = parts_from_yaml(MANIFEST).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].source, "https://git.launchpad.net/fwts");
    }
}
